//! Asynchronous Image Loading
//!
//! Sprite images are decoded off the tick. A load returns a `PendingImage`
//! handle that renderers poll once per frame; the tick never waits on it.
//! Native builds decode on a background thread; WASM has no threads, so
//! bytes are decoded inline and the handle is complete immediately.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[cfg(not(target_arch = "wasm32"))]
use std::sync::mpsc::{channel, Receiver, TryRecvError};
#[cfg(not(target_arch = "wasm32"))]
use std::thread;

/// Errors raised while loading an image asset
#[derive(Debug)]
pub enum AssetError {
    Io(std::io::Error),
    Decode(image::ImageError),
    /// Loading this way isn't possible on the current target
    Unsupported(String),
    /// Worker thread died before reporting a result
    Disconnected,
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Io(e)
    }
}

impl From<image::ImageError> for AssetError {
    fn from(e: image::ImageError) -> Self {
        AssetError::Decode(e)
    }
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetError::Io(e) => write!(f, "IO error: {}", e),
            AssetError::Decode(e) => write!(f, "Decode error: {}", e),
            AssetError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            AssetError::Disconnected => write!(f, "Loader thread disconnected"),
        }
    }
}

impl std::error::Error for AssetError {}

pub type AssetResult<T> = Result<T, AssetError>;

/// RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Decode any format the `image` features cover (png, jpeg, bmp)
    pub fn decode(bytes: &[u8]) -> AssetResult<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    /// Solid-color image, handy for generated sprites
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        }
    }
}

/// Poll state of a pending load
#[derive(Debug)]
pub enum LoadState<T> {
    Pending,
    Ready(T),
    Failed(AssetError),
}

/// Handle to an image decode that can be polled each frame
pub struct PendingImage {
    path: PathBuf,
    #[cfg(not(target_arch = "wasm32"))]
    receiver: Option<Receiver<AssetResult<DecodedImage>>>,
    result: Option<AssetResult<DecodedImage>>,
}

impl PendingImage {
    fn finished(path: PathBuf, result: AssetResult<DecodedImage>) -> Self {
        Self {
            path,
            #[cfg(not(target_arch = "wasm32"))]
            receiver: None,
            result: Some(result),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check for completion. Returns `Ready`/`Failed` exactly once, then
    /// `Pending` forever after (the result has been handed out).
    pub fn poll(&mut self) -> LoadState<DecodedImage> {
        #[cfg(not(target_arch = "wasm32"))]
        if self.result.is_none() {
            if let Some(receiver) = &self.receiver {
                match receiver.try_recv() {
                    Ok(result) => {
                        self.result = Some(result);
                        self.receiver = None;
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        // Thread panicked or dropped sender
                        self.result = Some(Err(AssetError::Disconnected));
                        self.receiver = None;
                    }
                }
            }
        }

        match self.result.take() {
            Some(Ok(image)) => LoadState::Ready(image),
            Some(Err(e)) => LoadState::Failed(e),
            None => LoadState::Pending,
        }
    }
}

/// Starts image loads relative to an asset root
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Read and decode an image file in the background
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_image(&self, path: impl AsRef<Path>) -> PendingImage {
        let full = self.resolve(path.as_ref());
        let (sender, receiver) = channel();
        let thread_path = full.clone();

        thread::spawn(move || {
            let result = std::fs::read(&thread_path)
                .map_err(AssetError::from)
                .and_then(|bytes| DecodedImage::decode(&bytes));
            let _ = sender.send(result);
        });

        PendingImage {
            path: full,
            receiver: Some(receiver),
            result: None,
        }
    }

    /// Browser builds can't read the filesystem; sprites must come in as
    /// bytes through `decode_bytes`.
    #[cfg(target_arch = "wasm32")]
    pub fn load_image(&self, path: impl AsRef<Path>) -> PendingImage {
        let full = self.resolve(path.as_ref());
        let msg = format!("{} must be supplied as bytes on the web", full.display());
        PendingImage::finished(full, Err(AssetError::Unsupported(msg)))
    }

    /// Decode already-fetched bytes (background thread on native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn decode_bytes(&self, name: impl Into<PathBuf>, bytes: Vec<u8>) -> PendingImage {
        let (sender, receiver) = channel();
        thread::spawn(move || {
            let _ = sender.send(DecodedImage::decode(&bytes));
        });
        PendingImage {
            path: name.into(),
            receiver: Some(receiver),
            result: None,
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn decode_bytes(&self, name: impl Into<PathBuf>, bytes: Vec<u8>) -> PendingImage {
        PendingImage::finished(name.into(), DecodedImage::decode(&bytes))
    }

    /// Hand out an image that is already in memory
    pub fn ready(&self, name: impl Into<PathBuf>, image: DecodedImage) -> PendingImage {
        PendingImage::finished(name.into(), Ok(image))
    }
}

/// Identifies an image in the `TextureStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

/// CPU-side images shared by renderers and the presentation surface.
///
/// Renderers insert decoded images and remove them on destroy; the surface
/// drains the upload/release lists to keep GPU textures in step.
#[derive(Debug, Default)]
pub struct TextureStore {
    images: HashMap<TextureId, DecodedImage>,
    next_id: u32,
    uploads: Vec<TextureId>,
    releases: Vec<TextureId>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: DecodedImage) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.images.insert(id, image);
        self.uploads.push(id);
        id
    }

    pub fn remove(&mut self, id: TextureId) -> bool {
        if self.images.remove(&id).is_some() {
            self.uploads.retain(|&u| u != id);
            self.releases.push(id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: TextureId) -> Option<&DecodedImage> {
        self.images.get(&id)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.images.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Textures inserted since the last call
    pub fn take_uploads(&mut self) -> Vec<TextureId> {
        std::mem::take(&mut self.uploads)
    }

    /// Textures removed since the last call
    pub fn take_releases(&mut self) -> Vec<TextureId> {
        std::mem::take(&mut self.releases)
    }
}
