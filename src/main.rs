//! wpreader - read a WordPress news site from the terminal
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use chrono::Utc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wpreader::api::WordPressClient;
use wpreader::auth::SessionCipher;
use wpreader::models::{
    Article, ArticleId, CategoryId, CommentDraft, FilterKey, MediaUpload, PostDraft, ProfileUpdate,
};
use wpreader::{Config, ContentCache, Database};

type Reader = ContentCache<WordPressClient, Database>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = parse_args()?;
    match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            print_version();
            return Ok(());
        }
        _ => {}
    }

    let reader = open_reader()?;
    match command {
        Command::Feed {
            category,
            search,
            pages,
        } => feed_cli(&reader, category, search.as_deref(), pages).await,
        Command::Categories => categories_cli(&reader).await,
        Command::Article { id } => article_cli(&reader, &id).await,
        Command::Bookmark { id } => bookmark_cli(&reader, &id),
        Command::Bookmarks => bookmarks_cli(&reader).await,
        Command::Login { username, password } => login_cli(&reader, &username, &password).await,
        Command::Logout => {
            reader.clear_session()?;
            println!("✓ Signed out");
            Ok(())
        }
        Command::Whoami => {
            whoami(&reader);
            Ok(())
        }
        Command::Comments { id } => comments_cli(&reader, &id).await,
        Command::Comment { id, text } => comment_cli(&reader, &id, &text).await,
        Command::Post {
            category,
            title,
            content,
            tags,
            image,
        } => post_cli(&reader, category, &title, &content, tags.as_deref(), image.as_deref()).await,
        Command::Profile { name } => profile_cli(&reader, name.as_deref()).await,
        Command::Help | Command::Version => Ok(()),
    }
}

/// CLI commands
enum Command {
    Feed {
        category: Option<CategoryId>,
        search: Option<String>,
        pages: u32,
    },
    Categories,
    Article {
        id: ArticleId,
    },
    Bookmark {
        id: ArticleId,
    },
    Bookmarks,
    Login {
        username: String,
        password: String,
    },
    Logout,
    Whoami,
    Comments {
        id: ArticleId,
    },
    Comment {
        id: ArticleId,
        text: String,
    },
    Post {
        category: CategoryId,
        title: String,
        content: String,
        tags: Option<String>,
        image: Option<std::path::PathBuf>,
    },
    Profile {
        name: Option<String>,
    },
    Help,
    Version,
}

fn flag_value<'a>(args: &'a [String], long: &str, short: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == long || a == short)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn article_arg(args: &[String]) -> Result<ArticleId> {
    args.get(2)
        .map(|id| ArticleId::from(id.as_str()))
        .ok_or_else(|| anyhow::anyhow!("Missing article id"))
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Feed {
            category: None,
            search: None,
            pages: 1,
        });
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "feed" => {
            let category = flag_value(&args, "--category", "-c")
                .map(str::parse)
                .transpose()
                .map_err(|_| anyhow::anyhow!("Category must be a numeric id"))?;
            let search = flag_value(&args, "--search", "-s").map(str::to_string);
            let pages = flag_value(&args, "--pages", "-p")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1)
                .max(1);
            Ok(Command::Feed {
                category,
                search,
                pages,
            })
        }

        "categories" | "cats" => Ok(Command::Categories),
        "article" | "read" => Ok(Command::Article {
            id: article_arg(&args)?,
        }),
        "bookmark" => Ok(Command::Bookmark {
            id: article_arg(&args)?,
        }),
        "bookmarks" => Ok(Command::Bookmarks),

        "login" => {
            let username = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing username"))?
                .clone();
            let password = args
                .get(3)
                .ok_or_else(|| anyhow::anyhow!("Missing password"))?
                .clone();
            Ok(Command::Login { username, password })
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),

        "comments" => Ok(Command::Comments {
            id: article_arg(&args)?,
        }),
        "comment" => {
            let id = article_arg(&args)?;
            let text = args[3..].join(" ");
            if text.trim().is_empty() {
                return Err(anyhow::anyhow!("Missing comment text"));
            }
            Ok(Command::Comment { id, text })
        }

        "post" => {
            let category: CategoryId = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing category id"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("Category must be a numeric id"))?;
            let title = args
                .get(3)
                .ok_or_else(|| anyhow::anyhow!("Missing post title"))?
                .clone();
            let content = args
                .get(4)
                .ok_or_else(|| anyhow::anyhow!("Missing post content"))?
                .clone();
            let tags = flag_value(&args, "--tags", "-t").map(str::to_string);
            let image = flag_value(&args, "--image", "-i").map(std::path::PathBuf::from);
            Ok(Command::Post {
                category,
                title,
                content,
                tags,
                image,
            })
        }

        "profile" => Ok(Command::Profile {
            name: flag_value(&args, "--name", "-n").map(str::to_string),
        }),

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'wpreader --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"wpreader - read a WordPress news site from the terminal

USAGE:
    wpreader                           Show the first page of the feed
    wpreader [COMMAND]

COMMANDS:
    feed [OPTIONS]                     Show the article feed
      Options:
        -c, --category <id>            Only articles in this category
        -s, --search <query>           Only articles matching the query
        -p, --pages <n>                Number of pages to load (default: 1)
      Examples:
        wpreader feed --category 3 --pages 2
        wpreader feed --search "fuel price"

    categories                         List categories
    article <id>                       Show one article
    bookmark <id>                      Toggle a bookmark
    bookmarks                          Show bookmarked articles
    login <username> <password>        Sign in
    logout                             Sign out
    whoami                             Show the current session
    comments <id>                      Show comments on an article
    comment <id> <text>                Post a comment (requires login)
    post <category> <title> <content> [OPTIONS]
                                       Submit a draft post (requires login)
      Options:
        -t, --tags <list>              Comma-separated tag names
        -i, --image <path>             Featured image to upload
      Examples:
        wpreader post 3 "Market day" "Prices rose" --tags lagos,markets
    profile [--name <name>]            Show or rename your profile

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}
"#,
        config_path
    );
}

fn print_version() {
    println!("wpreader {}", wpreader::VERSION);
}

fn open_reader() -> Result<Reader> {
    let config = Config::load()?;
    let settings = config.cache_settings();
    let client = WordPressClient::with_timeout(&config.site_url, settings.request_timeout)?;
    let db = Database::open()?;

    let reader = if config.seal_session {
        ContentCache::open_sealed(client, db, settings, SessionCipher::for_this_machine())?
    } else {
        ContentCache::open(client, db, settings)?
    };
    Ok(reader)
}

fn print_article_line(reader: &Reader, article: &Article) {
    let marker = if reader.is_bookmarked(&article.id) {
        "★"
    } else {
        " "
    };
    println!(
        "\n{} [{}] {} · {}",
        marker,
        article.id,
        article.title,
        article.relative_time(Utc::now())
    );
    if !article.author_name.is_empty() {
        println!("  by {}", article.author_name);
    }
    println!("  {}", article.preview(140));
}

async fn feed_cli(
    reader: &Reader,
    category: Option<CategoryId>,
    search: Option<&str>,
    pages: u32,
) -> Result<()> {
    let key = FilterKey::new(category, search);
    reader.select_filter(&key);

    for number in 1..=pages {
        let page = reader.load_page(&key, number).await?;
        if !page.has_more {
            break;
        }
    }

    let articles = reader.articles(&key);
    println!("Feed: {} ({} articles)", key, articles.len());
    println!("{}", "─".repeat(60));
    for article in &articles {
        print_article_line(reader, article);
    }

    let status = reader.feed_status(&key);
    if status.has_more {
        println!(
            "\nMore available: wpreader feed --pages {}",
            status.loaded_pages + 1
        );
    }
    Ok(())
}

async fn categories_cli(reader: &Reader) -> Result<()> {
    let categories = reader.load_categories().await?;
    for category in categories {
        match category.count {
            Some(count) => println!("  {:>5}  {} ({})", category.id, category.name, count),
            None => println!("  {:>5}  {}", category.id, category.name),
        }
    }
    Ok(())
}

async fn article_cli(reader: &Reader, id: &ArticleId) -> Result<()> {
    let article = reader.load_article(id).await?;

    println!("{}", article.title);
    println!(
        "{} · {}",
        article.author_name,
        article.published_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(link) = &article.link {
        println!("{}", link);
    }
    println!("{}", "─".repeat(60));
    println!("{}", article.plain_text());
    Ok(())
}

fn bookmark_cli(reader: &Reader, id: &ArticleId) -> Result<()> {
    let bookmarks = reader.toggle_bookmark(id)?;
    if bookmarks.contains(id) {
        println!("★ Bookmarked {}", id);
    } else {
        println!("✓ Removed bookmark {}", id);
    }
    Ok(())
}

async fn bookmarks_cli(reader: &Reader) -> Result<()> {
    let saved = reader.bookmarks();
    if saved.is_empty() {
        println!("No bookmarks yet.");
        println!("\nBookmark an article with:");
        println!("  wpreader bookmark <id>");
        return Ok(());
    }

    let articles = reader.load_bookmarked_articles().await;
    println!("Bookmarks ({} of {} loaded)", articles.len(), saved.len());
    for article in &articles {
        print_article_line(reader, article);
    }
    Ok(())
}

async fn login_cli(reader: &Reader, username: &str, password: &str) -> Result<()> {
    let session = reader.login(username, password).await?;
    println!(
        "✓ Signed in as {}",
        session.display_name().unwrap_or(username)
    );
    Ok(())
}

fn whoami(reader: &Reader) {
    let session = reader.session();
    match (session.is_authenticated(), session.display_name()) {
        (true, Some(name)) => println!("Signed in as {}", name),
        (true, None) => println!("Signed in"),
        (false, _) => println!("Not signed in"),
    }
}

async fn comments_cli(reader: &Reader, id: &ArticleId) -> Result<()> {
    let comments = reader.load_comments(id).await?;
    if comments.is_empty() {
        println!("No comments on {}", id);
        return Ok(());
    }
    for comment in comments {
        println!(
            "\n{} · {}",
            comment.author_name,
            comment.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("{}", comment.content);
    }
    Ok(())
}

async fn comment_cli(reader: &Reader, id: &ArticleId, text: &str) -> Result<()> {
    let comment = reader.post_comment(id, &CommentDraft::new(text)).await?;
    println!("✓ Comment {} posted", comment.id);
    Ok(())
}

async fn post_cli(
    reader: &Reader,
    category: CategoryId,
    title: &str,
    content: &str,
    tags: Option<&str>,
    image: Option<&std::path::Path>,
) -> Result<()> {
    let draft = PostDraft::new(title, content, category).with_tags(tags.unwrap_or_default());
    let media = image.map(MediaUpload::from_path).transpose()?;

    println!("Submitting post...");
    let post = reader.create_post(&draft, media.as_ref()).await?;
    match &post.link {
        Some(link) => println!("✓ Post {} saved as {}: {}", post.id, post.status, link),
        None => println!("✓ Post {} saved as {}", post.id, post.status),
    }
    Ok(())
}

async fn profile_cli(reader: &Reader, name: Option<&str>) -> Result<()> {
    let profile = match name {
        Some(name) => {
            let profile = reader
                .update_profile(&ProfileUpdate {
                    name: name.to_string(),
                })
                .await?;
            println!("✓ Profile updated");
            profile
        }
        None => reader.load_profile().await?,
    };

    println!("{} (#{})", profile.name, profile.id);
    if let Some(avatar) = &profile.avatar_url {
        println!("Avatar: {}", avatar);
    }
    Ok(())
}
