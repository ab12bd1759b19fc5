//! Background asset loading
//!
//! Reading, parsing and decoding run on a `futures` thread pool. Finished
//! work comes back to the main thread as [`LoadEvent`]s over a `flume`
//! channel and is applied there once per frame, so no scene state is ever
//! touched off the main thread. Jobs cannot be cancelled; a result for an
//! entity that no longer exists is simply dropped by the receiver.

use std::sync::Arc;

use futures::{executor::ThreadPool, future::try_join_all, task::SpawnExt};

use crate::{
    error::AssetError,
    gfx::{
        device::TextureHandle,
        scene::mesh_entity::{prepare_mesh, EntityId, MeshDescriptor, PreparedMesh},
    },
};

use super::{
    source::AssetSource,
    texture_data::{check_cube_faces, decode_cube_face, decode_texture, DecodedImage},
};

/// A finished load, ready to be applied on the main thread.
#[derive(Debug)]
pub enum LoadEvent {
    Mesh {
        entity: EntityId,
        result: Result<PreparedMesh, AssetError>,
    },
    Texture {
        handle: TextureHandle,
        path: String,
        result: Result<DecodedImage, AssetError>,
    },
    Cubemap {
        generation: u64,
        result: Result<Vec<DecodedImage>, AssetError>,
    },
}

/// The image files making up one cubemap, in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone, PartialEq)]
pub enum CubemapSources {
    Faces([String; 6]),
    /// One image used for all six faces. It is read and decoded once.
    Replicated(String),
}

enum Executor {
    Pool(ThreadPool),
    /// Runs every job immediately on the calling thread.
    Inline,
}

pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    executor: Executor,
    sender: flume::Sender<LoadEvent>,
    receiver: flume::Receiver<LoadEvent>,
}

impl AssetLoader {
    /// Creates a loader backed by `threads` worker threads.
    pub fn new(source: Arc<dyn AssetSource>, threads: usize) -> Result<Self, AssetError> {
        let pool = ThreadPool::builder()
            .pool_size(threads.max(1))
            .name_prefix("roomview-loader-")
            .create()
            .map_err(|e| AssetError::Loader(e.to_string()))?;
        log::info!("Asset loader started with {} threads", threads.max(1));
        Ok(Self::with_executor(source, Executor::Pool(pool)))
    }

    /// Creates a loader that does all work synchronously. Results still only
    /// become visible through [`AssetLoader::drain`].
    pub fn inline(source: Arc<dyn AssetSource>) -> Self {
        Self::with_executor(source, Executor::Inline)
    }

    fn with_executor(source: Arc<dyn AssetSource>, executor: Executor) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            source,
            executor,
            sender,
            receiver,
        }
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce(&dyn AssetSource) -> LoadEvent + Send + 'static,
    {
        let source = self.source.clone();
        let sender = self.sender.clone();
        let run = move || {
            if sender.send(job(&*source)).is_err() {
                log::debug!("Load finished after the loader was dropped");
            }
        };

        match &self.executor {
            Executor::Pool(pool) => pool.spawn_ok(async move { run() }),
            Executor::Inline => run(),
        }
    }

    /// Reads, parses and prepares a mesh for `entity`.
    pub fn load_mesh(&self, entity: EntityId, descriptor: MeshDescriptor) {
        log::debug!("Queueing mesh '{}' ({})", descriptor.name, descriptor.mesh_source);
        self.spawn(move |source| LoadEvent::Mesh {
            entity,
            result: prepare_mesh(source, &descriptor),
        });
    }

    /// Reads and decodes an image that will replace the placeholder `handle`.
    pub fn load_texture(&self, handle: TextureHandle, path: String) {
        self.spawn(move |source| {
            let result = source
                .read_bytes(&path)
                .and_then(|bytes| decode_texture(&bytes, &path));
            LoadEvent::Texture {
                handle,
                path,
                result,
            }
        });
    }

    /// Loads all cubemap faces, decoding distinct files in parallel.
    pub fn load_cubemap(&self, generation: u64, sources: CubemapSources) {
        match sources {
            CubemapSources::Replicated(path) => self.spawn(move |source| {
                let result = read_face(source, &path).and_then(|face| {
                    let faces = vec![face; 6];
                    check_cube_faces(&faces)?;
                    Ok(faces)
                });
                LoadEvent::Cubemap { generation, result }
            }),
            CubemapSources::Faces(paths) => match &self.executor {
                Executor::Inline => self.spawn(move |source| {
                    let result = paths
                        .iter()
                        .map(|path| read_face(source, path))
                        .collect::<Result<Vec<_>, _>>()
                        .and_then(|faces| check_cube_faces(&faces).map(|_| faces));
                    LoadEvent::Cubemap { generation, result }
                }),
                Executor::Pool(pool) => self.load_faces_parallel(pool, generation, paths),
            },
        }
    }

    fn load_faces_parallel(&self, pool: &ThreadPool, generation: u64, paths: [String; 6]) {
        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            let source = self.source.clone();
            match pool.spawn_with_handle(async move { read_face(&*source, &path) }) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    let event = LoadEvent::Cubemap {
                        generation,
                        result: Err(AssetError::Loader(e.to_string())),
                    };
                    let _ = self.sender.send(event);
                    return;
                }
            }
        }

        let sender = self.sender.clone();
        pool.spawn_ok(async move {
            let result = try_join_all(handles)
                .await
                .and_then(|faces| check_cube_faces(&faces).map(|_| faces));
            if sender.send(LoadEvent::Cubemap { generation, result }).is_err() {
                log::debug!("Cubemap finished after the loader was dropped");
            }
        });
    }

    /// Every event finished since the last call, in completion order.
    pub fn drain(&self) -> Vec<LoadEvent> {
        self.receiver.try_iter().collect()
    }
}

fn read_face(source: &dyn AssetSource, path: &str) -> Result<DecodedImage, AssetError> {
    let bytes = source.read_bytes(path)?;
    decode_cube_face(&bytes, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{source::MemorySource, texture_data::tests::png_bytes};
    use std::time::{Duration, Instant};

    fn faces() -> [String; 6] {
        ["px", "nx", "py", "ny", "pz", "nz"].map(|f| format!("sky/{}.png", f))
    }

    fn sky_source() -> MemorySource {
        faces()
            .iter()
            .fold(MemorySource::new(), |source, path| {
                source.with_bytes(path, png_bytes(4, 4))
            })
            .with_bytes("sky/white.png", png_bytes(2, 2))
    }

    fn wait_for_events(loader: &AssetLoader, count: usize) -> Vec<LoadEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while events.len() < count && Instant::now() < deadline {
            events.extend(loader.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn test_inline_texture_load_arrives_on_drain() {
        let source = Arc::new(MemorySource::new().with_bytes("tex/a.png", png_bytes(2, 2)));
        let loader = AssetLoader::inline(source.clone());
        loader.load_texture(TextureHandle::from_raw(7), "tex/a.png".to_string());

        let events = loader.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            LoadEvent::Texture { handle, path, result } => {
                assert_eq!(*handle, TextureHandle::from_raw(7));
                assert_eq!(path, "tex/a.png");
                assert!(result.is_ok());
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(loader.drain().is_empty());
    }

    #[test]
    fn test_replicated_cubemap_reads_once() {
        let source = Arc::new(sky_source());
        let loader = AssetLoader::inline(source.clone());
        loader.load_cubemap(3, CubemapSources::Replicated("sky/white.png".to_string()));

        match loader.drain().pop() {
            Some(LoadEvent::Cubemap { generation, result }) => {
                assert_eq!(generation, 3);
                assert_eq!(result.unwrap().len(), 6);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(source.reads("sky/white.png"), 1);
    }

    #[test]
    fn test_pooled_cubemap_loads_all_faces() {
        let source = Arc::new(sky_source());
        let loader = AssetLoader::new(source.clone(), 3).unwrap();
        loader.load_cubemap(1, CubemapSources::Faces(faces()));

        let events = wait_for_events(&loader, 1);
        match events.into_iter().next() {
            Some(LoadEvent::Cubemap { generation, result }) => {
                assert_eq!(generation, 1);
                let faces = result.unwrap();
                assert_eq!(faces.len(), 6);
                assert!(faces.iter().all(|f| f.width == 4 && f.height == 4));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_missing_face_fails_cubemap() {
        let source = Arc::new(MemorySource::new());
        let loader = AssetLoader::inline(source);
        loader.load_cubemap(1, CubemapSources::Faces(faces()));

        match loader.drain().pop() {
            Some(LoadEvent::Cubemap { result, .. }) => {
                assert!(matches!(result, Err(AssetError::NotFound(_))));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
