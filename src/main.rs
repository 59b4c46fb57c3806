use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use restaurant_recommender::config::AppConfig;
use restaurant_recommender::dashboard::{self, DashboardData};
use restaurant_recommender::dataset::{self, Aspect};
use restaurant_recommender::dishes;
use restaurant_recommender::feedback::{CsvFeedbackLog, FeedbackEntry, FeedbackStore};
use restaurant_recommender::geo::{self, GoogleMapsGeocoder, NearbyLookup};
use restaurant_recommender::insights;
use restaurant_recommender::presenter::{self, RestaurantDetails};
use restaurant_recommender::recommender::{Recommender, Strategy};
use restaurant_recommender::states::{State, StateCatalog};
use restaurant_recommender::RecommendError;

const RECENT_FEEDBACK: usize = 10;

#[derive(Parser)]
#[command(name = "restaurant-recommender")]
#[command(about = "Discover the best places to eat: similar restaurants, sentiment rankings and nearby finds")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "RESTAURANT_RECOMMENDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Output {
    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Restaurants most similar to one you like
    Similar {
        /// Name of the anchor restaurant
        name: String,
        /// Compare sentiment profiles instead of categories
        #[arg(long)]
        sentiment: bool,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        /// Re-sort the top results by rating instead of similarity
        #[arg(long)]
        by_rating: bool,
        /// Restaurant (or sentiment) table to read
        #[arg(long)]
        data: Option<PathBuf>,
        #[command(flatten)]
        output: Output,
    },
    /// Rank restaurants by the aspects you care about
    Rank {
        /// Aspects to rank by, in priority order
        #[arg(short, long = "aspect", value_enum)]
        aspects: Vec<Aspect>,
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
        /// Composite quantile that marks the top tier (0.50 to 0.90)
        #[arg(short, long)]
        quantile: Option<f64>,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        #[arg(long)]
        data: Option<PathBuf>,
        #[command(flatten)]
        output: Output,
    },
    /// Restaurants near an address
    Nearby {
        /// Free-text address, e.g. "Harborside Financial Center, Jersey City"
        #[arg(required = true)]
        address: Vec<String>,
        #[arg(short, long)]
        radius: Option<f64>,
        #[arg(long)]
        data: Option<PathBuf>,
        #[command(flatten)]
        output: Output,
    },
    /// Browse a state's restaurants
    Browse {
        #[arg(value_enum)]
        state: State,
        /// Show details for this restaurant
        name: Option<String>,
    },
    /// Dishes you can cook from the ingredients you have
    Dishes {
        /// Ingredients separated by commas
        ingredients: String,
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Cuisine, state and city statistics
    Insights {
        #[arg(long)]
        data: Option<PathBuf>,
        #[command(flatten)]
        output: Output,
    },
    /// Rate your experience and manage submitted feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
    /// Interactive terminal view of similar restaurants and recent feedback
    Dashboard {
        name: String,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
}

#[derive(Subcommand)]
enum FeedbackAction {
    /// Submit a rating (1-5) with a comment
    Add {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
        comment: String,
    },
    /// Show recent feedback
    List {
        #[arg(short, long, default_value_t = RECENT_FEEDBACK)]
        limit: usize,
    },
    /// Delete feedback rows by index (as shown by `list`)
    Delete {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Failures that narrow the view instead of ending the run.
fn degrade(err: RecommendError) -> Result<()> {
    match err {
        RecommendError::AnchorNotFound(_)
        | RecommendError::NotEnoughRows { .. }
        | RecommendError::NoFeatures
        | RecommendError::EmptyComment
        | RecommendError::InvalidRating(_) => {
            eprintln!("Warning: {}", err);
            Ok(())
        }
        other => Err(other.into()),
    }
}

fn pick(path: Option<PathBuf>, default: &Path) -> PathBuf {
    path.unwrap_or_else(|| default.to_path_buf())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Similar {
            name,
            sentiment,
            top_n,
            by_rating,
            data,
            output,
        } => {
            config.top_n = top_n.unwrap_or(config.top_n);
            config.sort_by_rating |= by_rating;
            config.validate()?;
            let recommender = Recommender::new(config.recommender())?;

            if sentiment {
                let path = pick(data, &config.data.sentiment);
                let records = dataset::load_sentiment(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                match recommender.similar_by_sentiment(&records, &name) {
                    Ok(results) if output.json => print_json(&results)?,
                    Ok(results) => {
                        println!("Top {} restaurants with a sentiment profile like {}:", results.len(), name);
                        for (pos, r) in results.iter().enumerate() {
                            println!("{:>3}. {:<40} similarity {:.3}", pos + 1, r.item.name, r.score);
                        }
                    }
                    Err(e) => degrade(e)?,
                }
            } else {
                let path = pick(data, &config.data.restaurants);
                let restaurants = dataset::load_restaurants(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                let restaurants = dataset::prepare_for_similarity(restaurants);
                match recommender.similar_restaurants(&restaurants, &name) {
                    Ok(results) if output.json => print_json(&results)?,
                    Ok(results) => {
                        print!("{}", presenter::render_similar(&name, &results));
                        if let Some(first) = results.first() {
                            println!();
                            print!("{}", RestaurantDetails::from(first.item).render());
                        }
                    }
                    Err(e) => degrade(e)?,
                }
            }
        }

        Command::Rank {
            aspects,
            strategy,
            quantile,
            top_n,
            data,
            output,
        } => {
            if !aspects.is_empty() {
                config.aspects = aspects;
            }
            config.strategy = strategy.unwrap_or(config.strategy);
            config.quantile = quantile.unwrap_or(config.quantile);
            config.top_n = top_n.unwrap_or(config.top_n);
            config.validate()?;

            let path = pick(data, &config.data.sentiment);
            let records = dataset::load_sentiment(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let recommender = Recommender::new(config.recommender())?;
            match recommender.rank_by_sentiment(&records) {
                Ok(ranking) if output.json => print_json(&ranking)?,
                Ok(ranking) => print!("{}", presenter::render_ranking(&ranking, &config.aspects)),
                Err(e) => degrade(e)?,
            }
        }

        Command::Nearby {
            address,
            radius,
            data,
            output,
        } => {
            config.radius_km = radius.unwrap_or(config.radius_km);
            config.validate()?;
            let query = address.join(" ");

            let path = pick(data, &config.data.geo);
            let restaurants = dataset::load_geo(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;

            let api_key = config
                .google_api_key
                .clone()
                .with_context(|| format!("Set {} to use the address search", restaurant_recommender::config::API_KEY_ENV))?;
            let geocoder = GoogleMapsGeocoder::new(api_key)?;

            let lookup = geo::nearby_for_address(
                &geocoder,
                &query,
                &restaurants,
                config.radius_km,
                config.nearby_limit,
            );
            match &lookup {
                NearbyLookup::Found { address, origin, nearby } => {
                    info!(%address, lat = origin.lat, lon = origin.lon, "resolved address");
                    if output.json {
                        print_json(nearby)?;
                    } else {
                        println!("Latitude: {}, Longitude: {}", origin.lat, origin.lon);
                        print!("{}", presenter::render_nearby(address, nearby, config.radius_km));
                    }
                }
                other => {
                    if let Some(message) = other.message(config.radius_km) {
                        eprintln!("{}", message);
                    }
                }
            }
        }

        Command::Browse { state, name } => {
            let catalog = StateCatalog::load(&config.data.states_dir, state)
                .with_context(|| format!("Failed to load restaurants for {}", state))?;
            match name {
                Some(name) => match catalog.find(&name) {
                    Some(restaurant) => print!("{}", RestaurantDetails::from(restaurant).render()),
                    None => eprintln!("Warning: no restaurant named '{}' in {}", name, state),
                },
                None => {
                    println!("Restaurants in {} (top {}):", state, restaurant_recommender::states::BROWSE_LIMIT);
                    for name in catalog.browse_names() {
                        println!("  {}", name);
                    }
                }
            }
        }

        Command::Dishes {
            ingredients,
            threshold,
            data,
        } => {
            config.dish_threshold = threshold.unwrap_or(config.dish_threshold);
            config.validate()?;
            if ingredients.trim().is_empty() {
                eprintln!("Warning: please enter ingredients to get recommendations.");
                return Ok(());
            }

            let path = pick(data, &config.data.dishes);
            let all = dishes::load_dishes(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let found = dishes::recommend_dishes(&all, &ingredients, config.dish_threshold);
            if found.is_empty() {
                println!("No recommended dishes found. Please try a different combination of ingredients.");
            }
            for (dish, similarity) in found {
                println!("{} ({:.2})", dish.title, similarity);
                for item in dish.ingredient_list() {
                    println!("  - {}", item);
                }
            }
        }

        Command::Insights { data, output } => {
            let path = pick(data, &config.data.restaurants);
            let restaurants = dataset::load_restaurants(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let summary = insights::compute(&restaurants);
            if output.json {
                print_json(&summary)?;
            } else {
                print!("{}", summary.render());
            }
        }

        Command::Feedback { action } => {
            let log = CsvFeedbackLog::open(&config.data.feedback)
                .with_context(|| format!("Failed to open {}", config.data.feedback.display()))?;
            match action {
                FeedbackAction::Add { rating, comment } => match FeedbackEntry::new(rating, &comment) {
                    Ok(entry) => {
                        log.append(&entry)?;
                        println!("Thanks for your feedback!");
                    }
                    Err(e) => degrade(e)?,
                },
                FeedbackAction::List { limit } => {
                    let cards = presenter::feedback_cards(&log.recent(limit)?);
                    print!("{}", presenter::render_feedback(&cards));
                }
                FeedbackAction::Delete { indices } => {
                    let indices: BTreeSet<usize> = indices.into_iter().collect();
                    let removed = log.delete(&indices)?;
                    println!("Deleted {} feedback row(s).", removed);
                }
            }
        }

        Command::Dashboard { name, top_n } => {
            config.top_n = top_n.unwrap_or(config.top_n);
            config.validate()?;
            let restaurants = dataset::load_restaurants(&config.data.restaurants)
                .with_context(|| format!("Failed to load {}", config.data.restaurants.display()))?;
            let restaurants = dataset::prepare_for_similarity(restaurants);
            let recommender = Recommender::new(config.recommender())?;
            let results = match recommender.similar_restaurants(&restaurants, &name) {
                Ok(results) => results,
                Err(e) => return degrade(e),
            };

            let log = CsvFeedbackLog::open(&config.data.feedback)?;
            let data = DashboardData {
                anchor: name,
                recommendations: results
                    .iter()
                    .map(|r| (RestaurantDetails::from(r.item), r.score))
                    .collect(),
                feedback: presenter::feedback_cards(&log.recent(RECENT_FEEDBACK)?),
            };
            dashboard::run_dashboard(&data).context("Dashboard error")?;
        }
    }

    Ok(())
}
