use clap::Parser;
use server::config::GameConfig;
use server::network::Server;

/// Main-method of the application.
/// Parses command-line arguments, builds the game configuration, and runs
/// the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Tick rate (simulation updates per second)
        #[clap(short, long, default_value = "20")]
        tick_rate: u32,
        /// World width in units
        #[clap(long)]
        world_width: Option<f32>,
        /// World height in units
        #[clap(long)]
        world_height: Option<f32>,
        /// Food particles maintained in the world
        #[clap(long)]
        food_target: Option<usize>,
    }

    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let mut config = GameConfig {
        tick_hz: args.tick_rate,
        ..GameConfig::default()
    };
    if let Some(width) = args.world_width {
        config.world_width = width;
    }
    if let Some(height) = args.world_height {
        config.world_height = height;
    }
    if let Some(target) = args.food_target {
        config.food_target = target;
    }

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, config).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
