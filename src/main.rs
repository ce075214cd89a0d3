use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use beam::hub::RelayHub;
use beam::server;

/// Fixed listening port; the relay takes no flags and no environment config
const PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, PORT));
    let hub = Arc::new(RelayHub::new());

    println!("📺 Beam Relay Server");
    println!("═══════════════════════════════════════");
    println!("Broadcast: http://localhost:{}", PORT);
    println!("Watch:     http://localhost:{}/view", PORT);
    println!();

    server::run(addr, hub).await
}
