use crate::domain::format::SourceFormat;
use crate::domain::model::Scene;
use crate::domain::ports::Host;
use crate::utils::error::{ConvertError, HostError, HostOperation, Result};
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::validate_path;
use std::fmt;
use std::path::{Path, PathBuf};

/// 之後的參數才屬於轉檔程式
pub const SEPARATOR: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ConversionRequest {
    /// 由分隔符號之後的參數建立：位置 0 為輸入、位置 1 為輸出，多餘的忽略
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let [input, output, rest @ ..] = args else {
            return Err(ConvertError::MissingArgument { found: args.len() });
        };
        if !rest.is_empty() {
            tracing::warn!("⚠️ Ignoring {} extra argument(s) after the output path", rest.len());
        }

        // 輸入路徑交由副檔名判斷處理，空字串會得到 UnsupportedFormat
        validate_path("output_file", output.as_ref())?;

        Ok(Self {
            input: PathBuf::from(input.as_ref()),
            output: PathBuf::from(output.as_ref()),
        })
    }

    /// 由完整的命令列建立；沒有分隔符號時視為沒有參數
    pub fn from_command_line<S: AsRef<str>>(argv: &[S]) -> Result<Self> {
        let trailing = argv
            .iter()
            .position(|arg| arg.as_ref() == SEPARATOR)
            .map_or(&argv[argv.len()..], |index| &argv[index + 1..]);
        Self::from_args(trailing)
    }

    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::from_path(&self.input)
    }
}

#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub format: SourceFormat,
    pub input: PathBuf,
    pub output: PathBuf,
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub bytes_written: u64,
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} ({} nodes, {} meshes, {} materials, {} vertices, {} triangles, {} bytes)",
            self.format,
            self.input.display(),
            self.output.display(),
            self.nodes,
            self.meshes,
            self.materials,
            self.vertices,
            self.triangles,
            self.bytes_written
        )
    }
}

pub struct ConversionDriver<H: Host> {
    host: H,
    monitor: SystemMonitor,
}

impl<H: Host> ConversionDriver<H> {
    pub fn new(host: H) -> Self {
        Self::new_with_monitoring(host, false)
    }

    pub fn new_with_monitoring(host: H, monitor_enabled: bool) -> Self {
        Self {
            host,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// 依序執行：判斷格式 → 重置場景 → 匯入 → 匯出 GLB
    pub fn run(&mut self, scene: &mut Scene, request: &ConversionRequest) -> Result<ConversionReport> {
        let format = request.format()?;
        tracing::info!("🚀 Converting {} file {}", format, request.input.display());

        self.host.reset_scene(scene);
        tracing::debug!("Scene reset");

        self.import(format, scene, &request.input)?;
        tracing::info!(
            "📥 Imported {} meshes ({} vertices, {} triangles)",
            scene.meshes.len(),
            scene.vertex_count(),
            scene.triangle_count()
        );
        self.monitor.log_stats("Import");

        let bytes_written = self
            .host
            .export_glb(scene, &request.output)
            .map_err(|source| host_error(HostOperation::ExportGlb, &request.output, source))?;
        tracing::info!("📦 Wrote {} bytes to {}", bytes_written, request.output.display());
        self.monitor.log_stats("Export");

        Ok(ConversionReport {
            format,
            input: request.input.clone(),
            output: request.output.clone(),
            nodes: scene.nodes.len(),
            meshes: scene.meshes.len(),
            materials: scene.materials.len(),
            vertices: scene.vertex_count(),
            triangles: scene.triangle_count(),
            bytes_written,
        })
    }

    fn import(&self, format: SourceFormat, scene: &mut Scene, path: &Path) -> Result<()> {
        let (operation, result) = match format {
            SourceFormat::Fbx => (HostOperation::ImportFbx, self.host.import_fbx(scene, path)),
            SourceFormat::Obj => (HostOperation::ImportObj, self.host.import_obj(scene, path)),
            SourceFormat::Stl => (HostOperation::ImportStl, self.host.import_stl(scene, path)),
        };
        result.map_err(|source| host_error(operation, path, source))
    }
}

fn host_error(operation: HostOperation, path: &Path, source: HostError) -> ConvertError {
    ConvertError::HostOperation {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Mesh, Node};
    use crate::utils::error::HostResult;
    use std::cell::RefCell;

    /// 記錄呼叫順序的假 host
    #[derive(Default)]
    struct RecordingHost {
        calls: RefCell<Vec<String>>,
        fail_import: bool,
    }

    impl RecordingHost {
        fn record(&self, call: &str, scene: &Scene) {
            self.calls
                .borrow_mut()
                .push(format!("{}:{}", call, if scene.is_empty() { "empty" } else { "dirty" }));
        }

        fn fake_import(&self, call: &str, scene: &mut Scene) -> HostResult<()> {
            self.record(call, scene);
            if self.fail_import {
                return Err(HostError::stl("corrupt"));
            }
            let mut mesh = Mesh::new(call);
            mesh.positions = vec![[0.0; 3]; 3];
            mesh.indices = vec![0, 1, 2];
            let mesh = scene.add_mesh(mesh);
            scene.add_root(Node::with_mesh(call, mesh));
            Ok(())
        }
    }

    impl Host for RecordingHost {
        fn reset_scene(&self, scene: &mut Scene) {
            self.record("reset", scene);
            scene.clear();
        }

        fn import_fbx(&self, scene: &mut Scene, _path: &Path) -> HostResult<()> {
            self.fake_import("fbx", scene)
        }

        fn import_obj(&self, scene: &mut Scene, _path: &Path) -> HostResult<()> {
            self.fake_import("obj", scene)
        }

        fn import_stl(&self, scene: &mut Scene, _path: &Path) -> HostResult<()> {
            self.fake_import("stl", scene)
        }

        fn export_glb(&self, scene: &Scene, _path: &Path) -> HostResult<u64> {
            self.record("export", scene);
            Ok(42)
        }
    }

    fn request(input: &str) -> ConversionRequest {
        ConversionRequest::from_args(&[input, "out.glb"]).unwrap()
    }

    #[test]
    fn test_dispatch_by_extension() {
        for (input, expected) in [
            ("a.fbx", "fbx"),
            ("a.FBX", "fbx"),
            ("a.obj", "obj"),
            ("a.Obj", "obj"),
            ("a.stl", "stl"),
            ("a.STL", "stl"),
        ] {
            let mut driver = ConversionDriver::new(RecordingHost::default());
            let mut scene = Scene::default();
            let report = driver.run(&mut scene, &request(input)).unwrap();

            assert_eq!(report.format.extension(), expected);
            assert_eq!(
                *driver.host().calls.borrow(),
                vec![
                    "reset:empty".to_string(),
                    format!("{}:empty", expected),
                    "export:dirty".to_string(),
                ]
            );
        }
    }

    #[test]
    fn test_unsupported_format_touches_nothing() {
        for input in ["scene.dae", "model", "model."] {
            let mut driver = ConversionDriver::new(RecordingHost::default());
            let mut scene = Scene::default();
            scene.add_root(Node::new("previous"));

            let err = driver.run(&mut scene, &request(input)).unwrap_err();
            assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
            assert!(driver.host().calls.borrow().is_empty());
            assert_eq!(scene.nodes.len(), 1);
        }
    }

    #[test]
    fn test_scene_is_reset_before_every_import() {
        let mut driver = ConversionDriver::new(RecordingHost::default());
        let mut scene = Scene::default();

        driver.run(&mut scene, &request("first.obj")).unwrap();
        let report = driver.run(&mut scene, &request("second.stl")).unwrap();

        assert_eq!(report.meshes, 1);
        assert_eq!(scene.meshes[0].name, "stl");
        let calls = driver.host().calls.borrow();
        assert_eq!(calls[3], "reset:dirty");
        assert_eq!(calls[4], "stl:empty");
    }

    #[test]
    fn test_import_failure_skips_export() {
        let host = RecordingHost {
            fail_import: true,
            ..RecordingHost::default()
        };
        let mut driver = ConversionDriver::new(host);
        let mut scene = Scene::default();

        let err = driver.run(&mut scene, &request("broken.stl")).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::HostOperation {
                operation: HostOperation::ImportStl,
                ..
            }
        ));
        assert_eq!(driver.host().calls.borrow().len(), 2);
    }

    #[test]
    fn test_missing_arguments() {
        let none: [&str; 0] = [];
        assert!(matches!(
            ConversionRequest::from_args(&none),
            Err(ConvertError::MissingArgument { found: 0 })
        ));
        assert!(matches!(
            ConversionRequest::from_args(&["only.obj"]),
            Err(ConvertError::MissingArgument { found: 1 })
        ));
    }

    #[test]
    fn test_command_line_separator() {
        let request =
            ConversionRequest::from_command_line(&["host", "--background", "--", "in.obj", "out.glb", "extra"])
                .unwrap();
        assert_eq!(request.input, PathBuf::from("in.obj"));
        assert_eq!(request.output, PathBuf::from("out.glb"));

        assert!(matches!(
            ConversionRequest::from_command_line(&["host", "in.obj", "out.glb"]),
            Err(ConvertError::MissingArgument { found: 0 })
        ));
        assert!(matches!(
            ConversionRequest::from_command_line(&["host", "--", "in.obj"]),
            Err(ConvertError::MissingArgument { found: 1 })
        ));
    }

    #[test]
    fn test_empty_input_is_unsupported_format() {
        let request = ConversionRequest::from_args(&["", "out.glb"]).unwrap();
        let mut driver = ConversionDriver::new(RecordingHost::default());
        let mut scene = Scene::default();

        let err = driver.run(&mut scene, &request).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedFormat { ref extension } if extension.is_empty()
        ));
        assert!(driver.host().calls.borrow().is_empty());
    }

    #[test]
    fn test_empty_output_rejected() {
        assert!(matches!(
            ConversionRequest::from_args(&["in.obj", ""]),
            Err(ConvertError::InvalidConfigValueError { .. })
        ));
    }
}
