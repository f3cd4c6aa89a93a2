#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    hero_glow::run_stage(hero_glow::StageConfig::default())
}

// The web build starts through `hero_glow::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
