use crate::RenderArgs;

pub async fn run(args: &RenderArgs) -> Result<(), anyhow::Error> {
    let site = args.site.to_site();
    let force = args.force;

    // Rendering is filesystem- and CPU-bound and runs its own worker pool;
    // keep it off the async runtime's core threads.
    tokio::task::spawn_blocking(move || site.render(force)).await??;

    Ok(())
}
