use crate::adapters::glb::ExportOptions;
use crate::adapters::{fbx, glb, obj, stl};
use crate::domain::model::{Node, Scene};
use crate::domain::ports::{ConfigProvider, Host, Storage};
use crate::utils::error::HostResult;
use std::path::Path;

/// 以本 crate 的匯入器與 GLB 匯出器實作的 host
pub struct NativeHost<S: Storage> {
    storage: S,
    global_scale: f32,
    export: ExportOptions,
}

impl<S: Storage> NativeHost<S> {
    pub fn new<C: ConfigProvider>(storage: S, config: &C) -> Self {
        Self {
            storage,
            global_scale: config.global_scale(),
            export: ExportOptions {
                generator: config.generator().to_string(),
                copyright: config.copyright().map(str::to_string),
            },
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string())
}

impl<S: Storage> Host for NativeHost<S> {
    fn import_fbx(&self, scene: &mut Scene, path: &Path) -> HostResult<()> {
        fbx::import(&self.storage, scene, path, self.global_scale)
    }

    fn import_obj(&self, scene: &mut Scene, path: &Path) -> HostResult<()> {
        obj::import(&self.storage, scene, path, self.global_scale)
    }

    fn import_stl(&self, scene: &mut Scene, path: &Path) -> HostResult<()> {
        let data = self.storage.read_file(path)?;
        let name = file_stem(path);
        let mesh = stl::parse(&name, &data, self.global_scale)?;
        let mesh = scene.add_mesh(mesh);
        scene.add_root(Node::with_mesh(name, mesh));
        Ok(())
    }

    fn export_glb(&self, scene: &Scene, path: &Path) -> HostResult<u64> {
        glb::write(&self.storage, scene, path, &self.export)
    }
}
