use anyhow::Result;
use mesh2glb::{
    ConversionDriver, ConversionRequest, ConvertError, LocalStorage, NativeHost, Scene, SourceFormat,
    TomlConfig,
};
use std::path::Path;
use tempfile::TempDir;

const CUBE_OBJ: &str = r#"
mtllib cube.mtl
o Cube
v -1 -1 -1
v  1 -1 -1
v  1  1 -1
v -1  1 -1
v -1 -1  1
v  1 -1  1
v  1  1  1
v -1  1  1
usemtl Red
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
"#;

const CUBE_MTL: &str = r#"
newmtl Red
Kd 1.0 0.0 0.0
d 1.0
"#;

const TRIANGLE_STL: &str = r#"solid triangle
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 2 0 0
      vertex 0 2 0
    endloop
  endfacet
endsolid triangle
"#;

fn driver(config: &TomlConfig) -> ConversionDriver<NativeHost<LocalStorage>> {
    ConversionDriver::new(NativeHost::new(LocalStorage::default(), config))
}

fn request(input: &Path, output: &Path) -> Result<ConversionRequest> {
    let args = [input.to_string_lossy().into_owned(), output.to_string_lossy().into_owned()];
    Ok(ConversionRequest::from_args(&args)?)
}

/// 讀回 GLB 並回傳 (節點數, 網格數, 頂點數)
fn inspect_glb(path: &Path) -> Result<(usize, usize, usize)> {
    let bytes = std::fs::read(path)?;
    assert_eq!(&bytes[..4], b"glTF");

    let (document, buffers, _images) = gltf::import_slice(&bytes)?;
    let mut vertices = 0;
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            vertices += reader.read_positions().map_or(0, |positions| positions.count());
        }
    }
    Ok((document.nodes().count(), document.meshes().count(), vertices))
}

#[test]
fn test_obj_to_glb() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("cube.obj");
    let output = temp_dir.path().join("cube.glb");
    std::fs::write(&input, CUBE_OBJ)?;
    std::fs::write(temp_dir.path().join("cube.mtl"), CUBE_MTL)?;

    let mut scene = Scene::default();
    let report = driver(&TomlConfig::default()).run(&mut scene, &request(&input, &output)?)?;

    assert_eq!(report.format, SourceFormat::Obj);
    assert_eq!(report.triangles, 12);
    assert_eq!(report.bytes_written, std::fs::metadata(&output)?.len());

    let (nodes, meshes, vertices) = inspect_glb(&output)?;
    assert_eq!(nodes, 1);
    assert_eq!(meshes, 1);
    assert_eq!(vertices, report.vertices);

    let gltf = gltf::Gltf::open(&output)?;
    let material = gltf.materials().next().expect("material exported");
    assert_eq!(material.name(), Some("Red"));
    assert_eq!(material.pbr_metallic_roughness().base_color_factor(), [1.0, 0.0, 0.0, 1.0]);
    Ok(())
}

#[test]
fn test_obj_without_mtl_still_converts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("cube.OBJ");
    let output = temp_dir.path().join("cube.glb");
    std::fs::write(&input, CUBE_OBJ)?;

    let mut scene = Scene::default();
    let report = driver(&TomlConfig::default()).run(&mut scene, &request(&input, &output)?)?;

    assert_eq!(report.format, SourceFormat::Obj);
    assert_eq!(inspect_glb(&output)?.1, 1);
    Ok(())
}

#[test]
fn test_consecutive_runs_do_not_leak_geometry() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cube = temp_dir.path().join("cube.obj");
    let triangle = temp_dir.path().join("triangle.stl");
    std::fs::write(&cube, CUBE_OBJ)?;
    std::fs::write(temp_dir.path().join("cube.mtl"), CUBE_MTL)?;
    std::fs::write(&triangle, TRIANGLE_STL)?;

    let mut driver = driver(&TomlConfig::default());
    let mut scene = Scene::default();

    driver.run(&mut scene, &request(&cube, &temp_dir.path().join("first.glb"))?)?;
    let second = temp_dir.path().join("second.glb");
    let report = driver.run(&mut scene, &request(&triangle, &second)?)?;

    assert_eq!(report.format, SourceFormat::Stl);
    assert_eq!(report.triangles, 1);
    assert_eq!(inspect_glb(&second)?, (1, 1, 3));

    let gltf = gltf::Gltf::open(&second)?;
    assert_eq!(gltf.nodes().next().and_then(|node| node.name()), Some("triangle"));
    Ok(())
}

#[test]
fn test_output_extension_is_not_checked() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("part.stl");
    let output = temp_dir.path().join("nested").join("out.bin");
    std::fs::write(&input, TRIANGLE_STL)?;

    let mut scene = Scene::default();
    driver(&TomlConfig::default()).run(&mut scene, &request(&input, &output)?)?;

    assert_eq!(inspect_glb(&output)?.2, 3);
    Ok(())
}

#[test]
fn test_global_scale_from_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("part.stl");
    let output = temp_dir.path().join("part.glb");
    std::fs::write(&input, TRIANGLE_STL)?;

    let config = TomlConfig::from_toml_str(
        r#"
[import]
global_scale = 0.5

[export]
copyright = "ACME"
"#,
    )?;
    let mut scene = Scene::default();
    driver(&config).run(&mut scene, &request(&input, &output)?)?;

    let gltf = gltf::Gltf::open(&output)?;
    assert_eq!(gltf.as_json().asset.copyright.as_deref(), Some("ACME"));
    let primitive = gltf.meshes().next().and_then(|mesh| mesh.primitives().next());
    let bounds = primitive.expect("primitive exported").bounding_box();
    assert!((bounds.max[0] - 1.0).abs() < 1e-5);
    Ok(())
}

#[test]
fn test_unsupported_format_writes_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("scene.dae");
    let output = temp_dir.path().join("scene.glb");
    std::fs::write(&input, "<COLLADA/>")?;

    let mut scene = Scene::default();
    let err = driver(&TomlConfig::default())
        .run(&mut scene, &request(&input, &output)?)
        .unwrap_err();

    assert!(matches!(err, ConvertError::UnsupportedFormat { ref extension } if extension == "dae"));
    assert_eq!(err.to_string(), "Unsupported file type: dae");
    assert_eq!(err.exit_code(), 2);
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_missing_input_reports_import_failure() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("missing.stl");
    let output = temp_dir.path().join("missing.glb");

    let mut scene = Scene::default();
    let err = driver(&TomlConfig::default())
        .run(&mut scene, &request(&input, &output)?)
        .unwrap_err();

    assert!(matches!(err, ConvertError::HostOperation { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_missing_arguments_after_separator() {
    let err = ConversionRequest::from_command_line(&["mesh2glb", "--", "only.obj"]).unwrap_err();
    assert!(matches!(err, ConvertError::MissingArgument { found: 1 }));
    assert_eq!(err.exit_code(), 2);
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_paths_feed_request() -> Result<()> {
    use clap::Parser;
    use mesh2glb::CliConfig;

    let cli = CliConfig::try_parse_from(["mesh2glb", "-v", "--", "Model.FBX", "model.glb", "ignored"])?;
    let request = ConversionRequest::from_args(cli.paths.as_slice())?;

    assert_eq!(request.format()?, SourceFormat::Fbx);
    assert_eq!(request.output, Path::new("model.glb"));
    Ok(())
}
