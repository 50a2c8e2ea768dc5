use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

const OBJ: &str = "mtllib colours.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl red
f 1/1 2/2 3/3 4/4
usemtl blue
f 1/1 2/2 3/3
";

const MTL: &str = "newmtl red
Kd 1 0 0
Ns 16
map_Kd textures\\red_diffuse.png

newmtl blue
Kd 0 0 1
Ns 64
map_Ks blue_spec.png
";

const SCENE: &str = r#"<scene>
  <model>model.obj</model>
  <light><position>1 2 3</position></light>
  <flashlight><cutoff>12.5</cutoff><outer-cutoff>17.5</outer-cutoff></flashlight>
</scene>
"#;

fn write_assets(dir: &Path, scene: &str) {
    fs::write(dir.join("model.obj"), OBJ).expect("write obj");
    fs::write(dir.join("colours.mtl"), MTL).expect("write mtl");
    fs::write(dir.join("scene.xml"), scene).expect("write scene");
}

fn asset_dir(scene: &str) -> TempDir {
    let dir = tempdir().expect("temp dir");
    write_assets(dir.path(), scene);
    dir
}

fn labyrinth() -> Command {
    Command::cargo_bin("labyrinth").expect("binary exists")
}

#[test]
fn summary_lists_meshes_materials_and_lights() {
    let dir = asset_dir(SCENE);
    labyrinth()
        .arg(dir.path().join("scene.xml"))
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("model.obj"))
        .stdout(contains("Meshes: 2"))
        .stdout(contains("3 triangles"))
        .stdout(contains(" - mesh 0: material=red triangles=2"))
        .stdout(contains(" - mesh 1: material=blue triangles=1"))
        .stdout(contains("Materials: 2"))
        .stdout(contains(" - blue: diffuse=- specular=blue_spec.png shininess=64.0"))
        .stdout(contains(" - red: diffuse=textures/red_diffuse.png specular=- shininess=16.0"))
        .stdout(contains("Point light: pos=(1.00, 2.00, 3.00) colour=(0.00, 1.00, 0.00)"))
        .stdout(contains("Flashlight: cutoff=12.5 outer=17.5"))
        .stdout(contains("Camera: pos=(0.00, 0.00, 3.00)"));
}

#[test]
fn missing_model_fails_with_context() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("scene.xml"), SCENE).expect("write scene");
    labyrinth()
        .arg(dir.path().join("scene.xml"))
        .arg("--summary-only")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unable to read model"));
}

#[test]
fn malformed_scene_is_rejected() {
    let dir = asset_dir("<scene><light><position>1 two 3</position></light></scene>");
    labyrinth()
        .arg(dir.path().join("scene.xml"))
        .arg("--summary-only")
        .assert()
        .failure()
        .stderr(contains("failed to parse scene"));
}

#[test]
fn unknown_flag_is_rejected() {
    labyrinth()
        .arg("--run-scripts")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --run-scripts"));
}
