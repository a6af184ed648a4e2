//! Command-line front end for the route planner session core.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ramble_core::{GenerateParams, LatLng, RouteGateway, RouteType, SessionController};
use ramble_gateway::{ApiClient, Config};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan outdoor routes against a ramble backend", long_about = None)]
struct Args {
    /// Route service URL (overrides RAMBLE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Start point latitude
    #[arg(long)]
    lat: f64,

    /// Start point longitude
    #[arg(long)]
    lng: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a route matching a target distance
    Generate {
        #[arg(long, default_value_t = 10.0)]
        distance_km: f64,

        /// Out-and-back instead of a loop
        #[arg(long)]
        out_and_back: bool,

        /// Target elevation gain in meters
        #[arg(long)]
        elevation_target: Option<f64>,

        /// Do not bias waypoints toward marked trails
        #[arg(long)]
        no_trails: bool,

        /// Save the generated route under this name
        #[arg(long)]
        save_as: Option<String>,
    },
    /// Draw waypoints and snap them to the road/trail network
    Snap {
        /// Waypoints as lat,lng pairs, e.g. 44.06,5.05 44.07,5.06
        #[arg(required = true)]
        waypoints: Vec<String>,
    },
    /// List pre-mapped routes near the start point
    Explore {
        #[arg(long, default_value_t = 5.0)]
        radius_km: f64,

        /// Route categories to query for
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<CliRouteType>>,
    },
    /// Saved-route operations
    Routes {
        #[command(subcommand)]
        command: RoutesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RoutesCommand {
    /// List saved routes, newest first
    List,
    /// Load one saved route and print its summary
    Show { id: Uuid },
    /// Delete a saved route
    Delete { id: Uuid },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliRouteType {
    Hiking,
    Foot,
    Bicycle,
    Mtb,
    Running,
}

impl From<CliRouteType> for RouteType {
    fn from(value: CliRouteType) -> Self {
        match value {
            CliRouteType::Hiking => RouteType::Hiking,
            CliRouteType::Foot => RouteType::Foot,
            CliRouteType::Bicycle => RouteType::Bicycle,
            CliRouteType::Mtb => RouteType::Mtb,
            CliRouteType::Running => RouteType::Running,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(api_url) = args.api_url {
        config.base_url = api_url;
    }

    let controller = SessionController::new(ApiClient::new(&config)?);
    controller.seed_user_location(Some(LatLng::new(args.lat, args.lng)));

    match args.command {
        Command::Generate {
            distance_km,
            out_and_back,
            elevation_target,
            no_trails,
            save_as,
        } => {
            controller
                .generate(GenerateParams {
                    distance_km,
                    loop_route: !out_and_back,
                    elevation_target,
                    prefer_trails: !no_trails,
                })
                .await;
            check_session_error(&controller)?;
            print_current_route(&controller);

            if let Some(name) = save_as {
                controller.save_current_route(&name).await;
                check_session_error(&controller)?;
                println!("Saved as \"{}\"", name);
            }
        }

        Command::Snap { waypoints } => {
            controller.start_drawing();
            for raw in &waypoints {
                controller.handle_map_click(parse_waypoint(raw)?);
            }
            controller.finalize_drawing().await;
            check_session_error(&controller)?;
            print_current_route(&controller);
        }

        Command::Explore { radius_km, types } => {
            controller.set_radius(radius_km);
            check_session_error(&controller)?;
            if let Some(types) = types {
                apply_route_types(&controller, &types);
            }
            controller.explore().await;
            check_session_error(&controller)?;

            controller.with_session(|session| {
                let routes = session.explored_routes();
                println!("{} routes within {} km:", routes.len(), session.radius_km);
                for route in routes {
                    println!(
                        "  {:>12}  {:<8} {:<30} {}",
                        route.osm_id,
                        route.route_type,
                        route.name.as_deref().unwrap_or("(unnamed)"),
                        route
                            .distance
                            .map(|km| format!("{:.1} km", km))
                            .unwrap_or_default(),
                    );
                }
            });
        }

        Command::Routes { command } => match command {
            RoutesCommand::List => {
                controller.refresh_saved_routes().await;
                controller.with_session(|session| {
                    if session.saved_routes.is_empty() {
                        println!("No saved routes.");
                    }
                    for summary in &session.saved_routes {
                        println!(
                            "  {}  {:<30} {:.1} km  {}",
                            summary.id,
                            summary.name,
                            summary.distance_km,
                            summary.created_at.format("%Y-%m-%d %H:%M"),
                        );
                    }
                });
            }
            RoutesCommand::Show { id } => {
                controller.load_saved_route(id).await;
                check_session_error(&controller)?;
                print_current_route(&controller);
            }
            RoutesCommand::Delete { id } => {
                controller.delete_saved_route(id).await;
                check_session_error(&controller)?;
                println!("Deleted {}", id);
            }
        },
    }

    Ok(())
}

/// Bring the session's route-type filter to exactly the requested set.
fn apply_route_types<G: RouteGateway>(controller: &SessionController<G>, types: &[CliRouteType]) {
    let desired: Vec<RouteType> = types.iter().map(|t| RouteType::from(*t)).collect();
    // Enable before disabling so the filter never bottoms out.
    for route_type in &desired {
        let enabled = controller.with_session(|s| s.filter.is_enabled(*route_type));
        if !enabled {
            controller.toggle_route_type(*route_type);
        }
    }
    for route_type in RouteType::ALL {
        let enabled = controller.with_session(|s| s.filter.is_enabled(route_type));
        if enabled && !desired.contains(&route_type) {
            controller.toggle_route_type(route_type);
        }
    }
}

fn parse_waypoint(raw: &str) -> Result<LatLng> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("expected lat,lng but got {raw:?}"))?;
    Ok(LatLng::new(
        lat.trim().parse().with_context(|| format!("bad latitude in {raw:?}"))?,
        lng.trim().parse().with_context(|| format!("bad longitude in {raw:?}"))?,
    ))
}

fn check_session_error<G: RouteGateway>(controller: &SessionController<G>) -> Result<()> {
    if let Some(message) = controller.with_session(|session| session.error.clone()) {
        bail!(message);
    }
    Ok(())
}

fn print_current_route<G: RouteGateway>(controller: &SessionController<G>) {
    let (_, fit) = controller.sync_layers();
    controller.with_session(|session| {
        if let Some(route) = session.route() {
            println!("Route: {:.1} km, {} points", route.distance_km, route.coordinates.len());
            if let (Some(gain), Some(loss)) = (route.elevation_gain, route.elevation_loss) {
                println!("Elevation: +{:.0} m / -{:.0} m", gain, loss);
            }
        }
    });
    if let Some(fit) = fit {
        println!(
            "Bounds: [{:.4}, {:.4}] .. [{:.4}, {:.4}]",
            fit.bounds.min_lng, fit.bounds.min_lat, fit.bounds.max_lng, fit.bounds.max_lat,
        );
    }
}
