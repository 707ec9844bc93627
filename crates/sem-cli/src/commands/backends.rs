//! Backends command
//!
//! Reports the one-time accelerator probe result.

use anyhow::Result;
use sem_compute::selector;
use tracing::trace;

pub fn run(verbose: bool) -> Result<()> {
    trace!("backends::run");
    print!("{}", sem_compute::describe_backends());

    if verbose {
        let sel = selector();
        println!("preference: {:?}", sel.preference());
        #[cfg(feature = "wgpu")]
        if let Some(ctx) = sel.wgpu_context() {
            let limits = ctx.limits();
            println!("max storage binding: {}", super::format_size(limits.max_storage_binding));
            println!("max buffer:          {}", super::format_size(limits.max_buffer_bytes));
            println!("max workgroups/dim:  {}", limits.max_workgroups_per_dim);
        }
    }
    Ok(())
}
