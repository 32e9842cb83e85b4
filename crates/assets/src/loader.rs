use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::AssetError;
use crate::gltf::{ModelData, import_model};
use crate::texture::{CubemapData, TextureData, load_cubemap, load_texture};

/// Identifies one background load so its outcome can be matched to a purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

/// What to load from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Texture(PathBuf),
    Cubemap(Vec<PathBuf>),
    Model(PathBuf),
}

impl LoadRequest {
    pub fn describe(&self) -> String {
        match self {
            LoadRequest::Texture(p) => format!("texture {}", p.display()),
            LoadRequest::Cubemap(faces) => match faces.first() {
                Some(p) => format!("cubemap {} (+{} faces)", p.display(), faces.len() - 1),
                None => "cubemap (no faces)".to_string(),
            },
            LoadRequest::Model(p) => format!("model {}", p.display()),
        }
    }

    fn run(&self) -> Result<LoadedAsset, AssetError> {
        match self {
            LoadRequest::Texture(p) => load_texture(p).map(LoadedAsset::Texture),
            LoadRequest::Cubemap(faces) => load_cubemap(faces.as_slice()).map(LoadedAsset::Cubemap),
            LoadRequest::Model(p) => import_model(p).map(LoadedAsset::Model),
        }
    }
}

/// Decoded result of a successful load.
#[derive(Debug, Clone)]
pub enum LoadedAsset {
    Texture(TextureData),
    Cubemap(CubemapData),
    Model(ModelData),
}

/// Completion record delivered back to the frame loop.
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub request: LoadRequest,
    pub result: Result<LoadedAsset, AssetError>,
}

/// Fire-and-forget background loader.
///
/// Each request runs on its own thread; outcomes queue on a channel until
/// the owner drains them with [`AssetLoader::poll`]. There is no timeout,
/// cancellation or retry.
pub struct AssetLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    next_ticket: u64,
    in_flight: usize,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    /// Start a load in the background and return its ticket.
    pub fn request(&mut self, request: LoadRequest) -> LoadTicket {
        self.dispatch(request, LoadRequest::run)
    }

    /// Run `work` for `request` on a worker thread. Exactly one outcome is
    /// sent per ticket, even when the work panics.
    fn dispatch<F>(&mut self, request: LoadRequest, work: F) -> LoadTicket
    where
        F: FnOnce(&LoadRequest) -> Result<LoadedAsset, AssetError> + Send + 'static,
    {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;
        tracing::debug!(ticket = ticket.0, what = %request.describe(), "load requested");

        let tx = self.tx.clone();
        let job = request.clone();
        let spawned = thread::Builder::new()
            .name(format!("asset-load-{}", ticket.0))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(&job)))
                    .unwrap_or_else(|payload| Err(AssetError::Panicked(panic_message(&*payload))));
                // The receiver is gone only when the session is shutting down.
                let _ = tx.send(LoadOutcome {
                    ticket,
                    request: job,
                    result,
                });
            });

        if let Err(e) = spawned {
            let _ = self.tx.send(LoadOutcome {
                ticket,
                request,
                result: Err(AssetError::Read {
                    path: PathBuf::from("<loader thread>"),
                    source: e,
                }),
            });
        }
        ticket
    }

    /// Drain every outcome that has arrived so far without blocking.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let done: Vec<LoadOutcome> = self.rx.try_iter().collect();
        self.in_flight -= done.len();
        done
    }

    /// Block until every outstanding request has completed.
    pub fn wait_all(&mut self) -> Vec<LoadOutcome> {
        let mut done = Vec::with_capacity(self.in_flight);
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(outcome) => {
                    self.in_flight -= 1;
                    done.push(outcome);
                }
                Err(_) => break,
            }
        }
        done
    }

    /// Number of requests whose outcome has not been drained yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_load_reports_once() {
        let mut loader = AssetLoader::new();
        let ticket = loader.request(LoadRequest::Texture("/missing/crate.png".into()));
        assert_eq!(loader.in_flight(), 1);

        let outcomes = loader.wait_all();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].ticket, ticket);
        assert!(outcomes[0].result.is_err());
        assert_eq!(loader.in_flight(), 0);
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn successful_texture_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let mut loader = AssetLoader::new();
        loader.request(LoadRequest::Texture(path));
        let outcomes = loader.wait_all();
        match &outcomes[0].result {
            Ok(LoadedAsset::Texture(t)) => assert_eq!(t.width, 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn tickets_are_sequential() {
        let mut loader = AssetLoader::new();
        let a = loader.request(LoadRequest::Model("/missing/a.glb".into()));
        let b = loader.request(LoadRequest::Model("/missing/b.glb".into()));
        assert!(b > a);
        let mut outcomes = loader.wait_all();
        outcomes.sort_by_key(|o| o.ticket);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].ticket, b);
    }

    #[test]
    fn panicking_job_still_reports_once() {
        let mut loader = AssetLoader::new();
        let ticket = loader.dispatch(LoadRequest::Model("broken.gltf".into()), |_| {
            panic!("index out of bounds")
        });

        let outcomes = loader.wait_all();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].ticket, ticket);
        assert!(matches!(
            &outcomes[0].result,
            Err(AssetError::Panicked(msg)) if msg == "index out of bounds"
        ));
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn describe_names_the_path() {
        let r = LoadRequest::Model("assets/monkey.glb".into());
        assert_eq!(r.describe(), "model assets/monkey.glb");
    }
}
