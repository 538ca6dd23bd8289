use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use clap::Parser;
use scene_import::{
    file_formats::{scenefile, skeletonfile},
    load_scene, Aabb, DirectoryProvider, ImportFlags, LoadedScene,
};

/// Converts a glTF asset into scene manifests plus a binary buffer.
#[derive(Parser, Debug)]
#[command(name = "import_scene")]
struct Args {
    /// .gltf or .glb file
    input: PathBuf,
    /// A directory named after the model is created in here
    #[arg(long, default_value = "assets/local")]
    out: PathBuf,
    /// Extra import step, e.g. gen-normals or calc-tangent-space. Repeatable.
    #[arg(long = "flag")]
    flags: Vec<ImportFlags>,
    /// Also write decoded textures as PNG
    #[arg(long)]
    textures: bool,
}

fn filename_without_extension(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Prefixed with the node's position so equal node names stay distinct.
fn skeleton_file_name(node_idx: usize, node_name: &str) -> String {
    format!("{}_{}.skeleton.json", node_idx, file_safe(node_name))
}

fn write_textures(
    scene: &LoadedScene,
    model_name: &str,
    directory: &Path,
) -> Result<Vec<Option<String>>, Box<dyn std::error::Error>> {
    let mut paths = vec![];
    for (idx, texture) in scene.textures.iter().enumerate() {
        match texture {
            Ok(texture) => {
                let file_name = format!("{}_{}.png", model_name, idx);
                image::save_buffer(
                    directory.join(&file_name),
                    &texture.pixels,
                    texture.width,
                    texture.height,
                    image::ExtendedColorType::Rgba8,
                )?;
                paths.push(Some(file_name));
            }
            Err(e) => {
                log::warn!("not writing texture {}: {}", idx, e);
                paths.push(None);
            }
        }
    }
    Ok(paths)
}

fn bake(
    scene: &LoadedScene,
    model_name: &str,
    out: &Path,
    textures: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let directory = out.join(model_name);
    fs::create_dir_all(&directory)?;
    let binary_name = format!("{}.bin", model_name);

    let mut index_buffer: Vec<u8> = vec![];
    let mut vertex_buffer: Vec<u8> = vec![];
    let mut aabb: Option<Aabb> = None;
    let mut output_nodes = vec![];

    for (node_idx, node) in scene.nodes.iter().enumerate() {
        let mut meshes = vec![];
        for mesh in &node.meshes {
            let mesh_aabb = mesh.aabb();
            if let Some(mesh_aabb) = mesh_aabb {
                aabb = Some(aabb.map_or(mesh_aabb, |acc| acc.union(&mesh_aabb)));
            }
            meshes.push(scenefile::Mesh {
                name: mesh.name.clone(),
                material: mesh.material_index,
                index_byte_offset: index_buffer.len() as u32,
                index_byte_length: mesh.index_bytes().len() as u32,
                vertex_byte_offset: vertex_buffer.len() as u32,
                vertex_byte_length: mesh.position_bytes().len() as u32,
                vertex_count: mesh.vertex_count() as u32,
                has_uvs: !mesh.uvs.is_empty(),
                has_normals: !mesh.normals.is_empty(),
                has_tangents: !mesh.tangents.is_empty(),
                bones: mesh
                    .bones
                    .iter()
                    .filter_map(|id| node.skeleton.bone(*id))
                    .map(|bone| bone.name.clone())
                    .collect(),
                aabb: mesh_aabb.map(scenefile::Aabb::from),
            });
            index_buffer.extend_from_slice(mesh.index_bytes());
            vertex_buffer.extend_from_slice(mesh.position_bytes());
        }

        let skeleton = match node.skeleton.bone_data() {
            Some(data) if !data.is_empty() => {
                let file_name = skeleton_file_name(node_idx, &node.name);
                let skeleton = skeletonfile::Skeleton::from(data);
                fs::write(directory.join(&file_name), serde_json::to_string_pretty(&skeleton)?)?;
                Some(file_name)
            }
            _ => None,
        };

        output_nodes.push(scenefile::Node {
            name: node.name.clone(),
            transform: node.transform.to_cols_array_2d(),
            meshes,
            skeleton,
        });
    }

    let texture_paths = if textures {
        write_textures(scene, model_name, &directory)?
    } else {
        vec![None; scene.textures.len()]
    };

    let manifest = scenefile::Scene {
        buffer: binary_name.clone(),
        // vertex data starts immediately after indices, u32 indices keep it 4-byte aligned
        vertex_buffer_start_offset: index_buffer.len() as u32,
        nodes: output_nodes,
        materials: scene.materials.iter().map(scenefile::Material::from).collect(),
        textures: texture_paths,
        animations: scene
            .animations
            .iter()
            .map(|clip| scenefile::Animation {
                name: clip.name.clone(),
                duration: clip.duration,
                nodes: clip.tracks.iter().map(|t| t.node_name.clone()).collect(),
            })
            .collect(),
        aabb: aabb.map(scenefile::Aabb::from),
    };

    let mut binary_file = File::create(directory.join(&binary_name))?;
    binary_file.write_all(&index_buffer)?;
    binary_file.write_all(&vertex_buffer)?;

    let json_path = directory.join(format!("{}.scene.json", model_name));
    fs::write(&json_path, serde_json::to_string_pretty(&manifest)?)?;
    log::info!("wrote {}", json_path.display());

    Ok(())
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let extra_flags = args
        .flags
        .iter()
        .fold(ImportFlags::empty(), |acc, flag| acc | *flag);
    let model_name = filename_without_extension(&args.input).ok_or("input path has no file name")?;
    let file_name = args
        .input
        .file_name()
        .ok_or("input path has no file name")?
        .to_string_lossy()
        .into_owned();
    let provider = DirectoryProvider::new(args.input.parent().unwrap_or(Path::new(".")));

    let scene = load_scene(&file_name, &provider, extra_flags)?;
    bake(&scene, &model_name, &args.out, args.textures)?;

    Ok(())
}
