// Render the built-in demo scene to an image file.
// Run with: cargo run --release -- [config.json] [output.png]

use std::env;
use std::fs;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use umbra_math::Vec3;
use umbra_renderer::{
    render, Camera, CheckerTexture, Color, Dielectric, DiffuseLight, Glossy, Lambertian, Metal,
    RenderConfig, Scene, Sphere, Triangle,
};

const DEFAULT_OUTPUT: &str = "render.png";

fn load_config(path: Option<&str>) -> Result<RenderConfig> {
    let Some(path) = path else {
        log::info!("No config given, using defaults");
        return Ok(RenderConfig::default());
    };

    let json = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
    let config = RenderConfig::from_json(&json).with_context(|| format!("parsing config {path}"))?;
    log::info!("Loaded config from {path}");
    Ok(config)
}

/// Ground plane, a row of spheres and a triangle light overhead.
fn demo_scene(config: &RenderConfig) -> Result<Scene> {
    let mut builder = Scene::builder();

    builder.add(Sphere::new(
        Vec3::new(0.0, -1000.0, 0.0),
        1000.0,
        Lambertian::new(Color::new(0.5, 0.5, 0.5)),
    ));
    let checker = CheckerTexture::new(Color::new(0.7, 0.2, 0.15), Color::splat(0.9), 8.0);
    builder.add(Sphere::new(Vec3::new(-2.2, 1.0, 0.0), 1.0, Lambertian::textured(checker)));
    builder.add(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, Dielectric::new(1.5)));
    builder.add(Sphere::new(Vec3::new(2.2, 1.0, 0.0), 1.0, Metal::new(Color::new(0.8, 0.7, 0.6), 0.05)));
    builder.add(Sphere::new(
        Vec3::new(0.0, 0.4, 2.0),
        0.4,
        Glossy::new(Color::new(0.2, 0.4, 0.9), 0.3, 0.0),
    ));

    let emit = DiffuseLight::new(Color::splat(6.0));
    let (a, b, c, d) = (
        Vec3::new(-1.5, 5.0, -1.5),
        Vec3::new(1.5, 5.0, -1.5),
        Vec3::new(1.5, 5.0, 1.5),
        Vec3::new(-1.5, 5.0, 1.5),
    );
    builder.add_light(Triangle::new(a, c, b, emit.clone()));
    builder.add_light(Triangle::new(a, d, c, emit));

    let mut rng = match config.seed {
        Some(seed) => Xoshiro256StarStar::seed_from_u64(seed),
        None => Xoshiro256StarStar::from_entropy(),
    };
    let scene = builder.build(config.bvh, &mut rng).context("building BVH")?;
    Ok(scene)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = load_config(args.get(1).map(String::as_str))?;
    let output_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);

    let scene = demo_scene(&config)?;
    let mut camera = Camera::new()
        .with_resolution(config.width, config.height)
        .with_position(Vec3::new(0.0, 2.5, 9.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)
        .with_lens(30.0, 0.3, 9.0);
    camera.initialize();

    let output = render(&scene, &camera, &config).context("rendering")?;
    log::info!(
        "Rendered {} samples on {} threads in {:.2?}",
        output.stats.camera_samples,
        output.stats.threads,
        output.stats.elapsed
    );

    let image = &output.image;
    image::save_buffer(
        output_path,
        &image.to_rgb8(),
        image.width,
        image.height,
        image::ColorType::Rgb8,
    )
    .with_context(|| format!("writing {output_path}"))?;
    log::info!("Wrote {output_path} ({}x{})", image.width, image.height);

    Ok(())
}
