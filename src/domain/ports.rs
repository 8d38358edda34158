use crate::domain::model::Scene;
use crate::utils::error::HostResult;
use std::path::Path;

pub trait Storage {
    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> std::io::Result<()>;
}

pub trait ConfigProvider {
    fn global_scale(&self) -> f32;
    fn generator(&self) -> &str;
    fn copyright(&self) -> Option<&str>;
    fn monitoring_enabled(&self) -> bool;
}

/// 轉檔驅動程式所依賴的 host 操作：重置場景、三種匯入、一種匯出
pub trait Host {
    fn reset_scene(&self, scene: &mut Scene) {
        scene.clear();
    }

    fn import_fbx(&self, scene: &mut Scene, path: &Path) -> HostResult<()>;
    fn import_obj(&self, scene: &mut Scene, path: &Path) -> HostResult<()>;
    fn import_stl(&self, scene: &mut Scene, path: &Path) -> HostResult<()>;

    /// 一律輸出 GLB 容器，回傳寫入的位元組數
    fn export_glb(&self, scene: &Scene, path: &Path) -> HostResult<u64>;
}
