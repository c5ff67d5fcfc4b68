// Serves the browser runtime config

use bazunia_lib::{config, runtime_config, RuntimeConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    bazunia_lib::init_tracing();

    let runtime = RuntimeConfig::from_env();
    if !runtime.is_valid() {
        tracing::warn!("Supabase is not configured; the app will run without sync");
    }

    let addr = config::config_server_addr()?;
    runtime_config::serve(addr, &runtime)?;
    Ok(())
}
