use crate::api::links::{LinkDraft, LinkError};
use crate::api::{self, blogs::BlogDraft, content::TitleKey, products};
use crate::config::Config;
use crate::gateway::{ApiError, Gateway};
use crate::guard::{Decision, Route, RouteGuard};
use anyhow::{bail, Context as _, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub struct Context {
    pub config: Config,
    pub gateway: Gateway,
    pub guard: RouteGuard,
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with an administrator account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GOLD_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Headline counts
    Dashboard,
    #[command(subcommand)]
    Users(UsersCommand),
    #[command(subcommand)]
    Products(ProductsCommand),
    #[command(subcommand)]
    Blogs(BlogsCommand),
    #[command(subcommand)]
    Privacy(PrivacyCommand),
    /// Onboarding titles
    #[command(subcommand)]
    Titles(TitlesCommand),
    /// Promo video
    #[command(subcommand)]
    Video(VideoCommand),
    /// Outbound social links
    #[command(subcommand)]
    Links(LinksCommand),
    /// Interactive shell (the default when no command is given)
    Shell,
}

impl Command {
    /// The view a command belongs to, if it needs one
    pub fn route(&self) -> Option<Route> {
        match self {
            Command::Login { .. } | Command::Logout | Command::Whoami | Command::Shell => None,
            Command::Dashboard => Some(Route::Dashboard),
            Command::Users(_) => Some(Route::Users),
            Command::Products(_) => Some(Route::Products),
            Command::Blogs(_) => Some(Route::Blogs),
            Command::Privacy(_) => Some(Route::Privacy),
            Command::Titles(_) => Some(Route::Titles),
            Command::Video(_) => Some(Route::Videos),
            Command::Links(_) => Some(Route::SocialLinks),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    List {
        /// Only accounts whose name or email contains this text
        #[arg(long)]
        search: Option<String>,
    },
    Delete { id: u64 },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ApprovalArg {
    All,
    Approved,
    Pending,
}

#[derive(ClapArgs, Debug)]
pub struct ProductListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, value_enum, default_value = "all")]
    pub status: ApprovalArg,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub metal: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub karat: Option<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long)]
    pub product_type: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
}

impl From<ProductListArgs> for products::ProductFilter {
    fn from(args: ProductListArgs) -> Self {
        Self {
            approval: match args.status {
                ApprovalArg::All => products::Approval::All,
                ApprovalArg::Approved => products::Approval::Approved,
                ApprovalArg::Pending => products::Approval::Pending,
            },
            search: args.search,
            metal: args.metal,
            category: args.category,
            karat: args.karat,
            min_price: args.min_price,
            max_price: args.max_price,
            product_type: args.product_type,
            city: args.city,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ProductsCommand {
    List(ProductListArgs),
    Approve { id: u64 },
    Reject { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum BlogsCommand {
    List,
    Show {
        id: u64,
    },
    /// Create from a JSON draft: {"name", "image_path", "titles": [{"title", "type", "contents": [..]}]}
    Create {
        #[arg(long)]
        file: PathBuf,
        /// Upload this cover image and use its path
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Update {
        id: u64,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Delete {
        id: u64,
    },
    UploadImage {
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrivacyCommand {
    Show,
    Set {
        #[arg(long)]
        title: String,
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TitlesCommand {
    Show,
    /// Key is one of: title, subTitle1, title2, subTitle2, title3, subTitle3
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum VideoCommand {
    Show,
    Upload { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum LinksCommand {
    List,
    Add { name: String, value: String },
    Update { id: u64, name: String, value: String },
    Delete { id: u64 },
}

/// Check the guard for `route` before running anything in it
fn enter(ctx: &Context, route: Route) -> Result<()> {
    match ctx.guard.check(route) {
        Decision::Render(_) => Ok(()),
        Decision::Redirect { to, .. } => bail!(
            "{} needs an administrator session; sign in first ({} via `gold-admin login --email ...`)",
            route,
            to
        ),
    }
}

fn gw(ctx: &Context) -> &Gateway {
    &ctx.gateway
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run_once(ctx: &Context, command: Command) -> Result<()> {
    if let Some(route) = command.route() {
        enter(ctx, route)?;
    }

    match command {
        Command::Login { email, password } => login(ctx, &email, password),
        Command::Logout => {
            api::auth::logout(gw(ctx)).context("clearing saved session")?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => whoami(ctx),
        Command::Dashboard => {
            let stats = api::dashboard::stats(gw(ctx)).context("loading dashboard")?;
            if ctx.json {
                return print_json(&stats);
            }
            println!("Users:            {}", stats.users);
            println!("Products:         {}", stats.products);
            println!("Pending products: {}", stats.pending_products);
            println!("Blogs:            {}", stats.blogs);
            Ok(())
        }
        Command::Users(cmd) => users(ctx, cmd),
        Command::Products(cmd) => products_view(ctx, cmd),
        Command::Blogs(cmd) => blogs(ctx, cmd),
        Command::Privacy(cmd) => privacy(ctx, cmd),
        Command::Titles(cmd) => titles(ctx, cmd),
        Command::Video(cmd) => video(ctx, cmd),
        Command::Links(cmd) => links(ctx, cmd),
        Command::Shell => bail!("already running a single command; start `gold-admin` with no arguments for the shell"),
    }
}

/// The given password, or one typed at a prompt that does not echo
fn resolve_password(
    given: Option<String>,
    prompt: impl FnOnce() -> std::io::Result<String>,
) -> Result<String> {
    match given {
        Some(p) => Ok(p),
        None => prompt().context("reading password (set GOLD_ADMIN_PASSWORD when not on a terminal)"),
    }
}

fn login(ctx: &Context, email: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password, || rpassword::prompt_password("Password: "))?;
    let user = api::auth::login(gw(ctx), ctx.guard.allowed(), email, &password)
        .context("sign-in failed")?;
    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

fn whoami(ctx: &Context) -> Result<()> {
    let session = ctx.gateway.session().snapshot();
    if ctx.json {
        return print_json(&session.current_user);
    }
    match session.current_user() {
        Some(user) if session.is_authenticated() => {
            let roles: Vec<&str> = user.roles.iter().map(|r| r.name.as_str()).collect();
            println!("{} <{}> roles: {}", user.name, user.email, roles.join(", "));
            if !ctx.guard.allowed().permits(user) {
                println!("This role may not open the admin views.");
            }
        }
        _ => println!("Not signed in"),
    }
    Ok(())
}

fn users(ctx: &Context, cmd: UsersCommand) -> Result<()> {
    match cmd {
        UsersCommand::List { search } => {
            let mut users = api::users::list(gw(ctx)).context("loading users")?;
            if let Some(query) = search {
                users = api::users::search(users, &query);
            }
            if ctx.json {
                return print_json(&users);
            }
            for u in &users {
                println!(
                    "{:>6}  {:<24} {:<32} {:<10} {}",
                    u.id,
                    u.name,
                    u.email,
                    u.status,
                    u.phone.as_deref().unwrap_or("-")
                );
            }
            println!("{} users", users.len());
        }
        UsersCommand::Delete { id } => {
            api::users::delete(gw(ctx), id).context("deleting user")?;
            println!("Deleted user {}", id);
        }
    }
    Ok(())
}

fn products_view(ctx: &Context, cmd: ProductsCommand) -> Result<()> {
    match cmd {
        ProductsCommand::List(args) => {
            let page = args.page;
            let filter = products::ProductFilter::from(args);
            let listing = products::list(gw(ctx), page, &filter).context("loading products")?;
            if ctx.json {
                return print_json(&listing.products);
            }
            for p in &listing.products {
                println!(
                    "{:>6}  {:<32} {:<8} {:>4}K {:>10}  {}",
                    p.id,
                    p.title,
                    p.metal,
                    p.karat,
                    p.price,
                    if p.is_approved { "approved" } else { "pending" }
                );
            }
            println!("page {} of {}", listing.page, listing.last_page);
        }
        ProductsCommand::Approve { id } => {
            products::approve(gw(ctx), id).context("approving product")?;
            println!("Approved product {}", id);
        }
        ProductsCommand::Reject { id } => {
            products::reject(gw(ctx), id).context("rejecting product")?;
            println!("Rejected product {}", id);
        }
    }
    Ok(())
}

fn read_draft(path: &Path) -> Result<BlogDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading blog draft {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing blog draft {}", path.display()))
}

fn blogs(ctx: &Context, cmd: BlogsCommand) -> Result<()> {
    match cmd {
        BlogsCommand::List => {
            let blogs = api::blogs::list(gw(ctx)).context("loading blogs")?;
            if ctx.json {
                return print_json(&blogs);
            }
            for b in &blogs {
                println!("{:>6}  {:<40} {} sections", b.id, b.name, b.titles.len());
            }
        }
        BlogsCommand::Show { id } => {
            let blogs = api::blogs::list(gw(ctx)).context("loading blogs")?;
            let Some(blog) = blogs.iter().find(|b| b.id == id) else {
                bail!("no blog with id {}", id);
            };
            if ctx.json {
                return print_json(blog);
            }
            println!("# {}", blog.name);
            println!(
                "image: {}",
                api::content::storage_url(ctx.config.storage_base_url(), &blog.image_path)
            );
            for title in &blog.titles {
                println!("\n## {} ({})", title.title, title.kind);
                for c in &title.contents {
                    println!("- {}", c.content);
                }
            }
        }
        BlogsCommand::Create { file, image } => {
            let mut draft = read_draft(&file)?;
            if let Some(image) = image {
                draft.image_path = api::blogs::upload_image(gw(ctx), &image)
                    .context("uploading cover image")?;
            }
            api::blogs::create(gw(ctx), &draft).context("creating blog")?;
            println!("Created blog '{}'", draft.name);
        }
        BlogsCommand::Update { id, file, image } => {
            let mut draft = read_draft(&file)?;
            if let Some(image) = image {
                draft.image_path = api::blogs::upload_image(gw(ctx), &image)
                    .context("uploading cover image")?;
            }
            api::blogs::update(gw(ctx), id, &draft).context("updating blog")?;
            println!("Updated blog {}", id);
        }
        BlogsCommand::Delete { id } => {
            api::blogs::delete(gw(ctx), id).context("deleting blog")?;
            println!("Deleted blog {}", id);
        }
        BlogsCommand::UploadImage { path } => {
            let stored = api::blogs::upload_image(gw(ctx), &path).context("uploading image")?;
            println!("{}", stored);
        }
    }
    Ok(())
}

fn privacy(ctx: &Context, cmd: PrivacyCommand) -> Result<()> {
    match cmd {
        PrivacyCommand::Show => {
            let policy = api::content::privacy(gw(ctx)).context("loading privacy policy")?;
            if ctx.json {
                return print_json(&policy);
            }
            println!("{}", policy.title);
            for item in &policy.list {
                println!("- {}", item);
            }
        }
        PrivacyCommand::Set { title, items } => {
            if items.iter().all(|i| i.trim().is_empty()) {
                bail!("the policy needs at least one non-empty item");
            }
            api::content::save_privacy(gw(ctx), &title, &items)
                .context("saving privacy policy")?;
            println!("Saved privacy policy");
        }
    }
    Ok(())
}

fn titles(ctx: &Context, cmd: TitlesCommand) -> Result<()> {
    let origin = ctx.config.content_base_url();
    match cmd {
        TitlesCommand::Show => {
            let titles = api::content::titles(gw(ctx), origin).context("loading titles")?;
            if ctx.json {
                let map: serde_json::Map<String, serde_json::Value> = titles
                    .iter()
                    .map(|(k, v)| (k.key().to_string(), v.clone().into()))
                    .collect();
                return print_json(&map);
            }
            for (key, value) in &titles {
                println!("{:<10} {}", key, value);
            }
        }
        TitlesCommand::Set { key, value } => {
            let Some(key) = TitleKey::parse(&key) else {
                bail!("unknown title '{}'", key);
            };
            api::content::update_title(gw(ctx), origin, key, &value)
                .context("saving title")?;
            println!("Saved {}", key);
        }
    }
    Ok(())
}

fn video(ctx: &Context, cmd: VideoCommand) -> Result<()> {
    let origin = ctx.config.content_base_url();
    let item = match cmd {
        VideoCommand::Show => {
            api::content::current_video(gw(ctx), origin).context("loading current video")?
        }
        VideoCommand::Upload { path } => {
            let item = api::content::upload_video(gw(ctx), origin, &path)
                .context("uploading video")?;
            println!("Uploaded {}", path.display());
            item
        }
    };
    if ctx.json {
        return print_json(&item);
    }
    println!(
        "{}",
        api::content::storage_url(ctx.config.storage_base_url(), &item.value)
    );
    if let Some(updated) = item.updated_at {
        println!("updated {}", updated.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

/// Link endpoints explain validation failures in the body's message
fn link_failure(action: &str, err: &ApiError) -> anyhow::Error {
    let message = err.server_message().unwrap_or_else(|| err.to_string());
    anyhow::anyhow!("{}: {}", action, message)
}

fn links(ctx: &Context, cmd: LinksCommand) -> Result<()> {
    match cmd {
        LinksCommand::List => {
            let links = api::links::list(gw(ctx)).context("loading links")?;
            if ctx.json {
                return print_json(&links);
            }
            for l in &links {
                println!("{:>6}  {:<20} {}", l.id, l.name, l.value);
            }
        }
        LinksCommand::Add { name, value } => {
            api::links::create(gw(ctx), &LinkDraft::new(name, value)).map_err(|e| match e {
                LinkError::Api(e) => link_failure("adding link", &e),
                other => anyhow::anyhow!("adding link: {}", other),
            })?;
            println!("Added link");
        }
        LinksCommand::Update { id, name, value } => {
            api::links::update(gw(ctx), id, &LinkDraft::new(name, value))
                .map_err(|e| link_failure("updating link", &e))?;
            println!("Updated link {}", id);
        }
        LinksCommand::Delete { id } => {
            api::links::delete(gw(ctx), id).context("deleting link")?;
            println!("Deleted link {}", id);
        }
    }
    Ok(())
}

/// One shell line, parsed with the same definitions as the command line
#[derive(Parser, Debug)]
#[command(name = "gold-admin", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".gold-admin").join("history.txt"))
}

fn prompt(ctx: &Context) -> String {
    match ctx.gateway.session().snapshot().current_user() {
        Some(user) => format!("{}> ", user.email),
        None => "signed out> ".to_string(),
    }
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    println!("gold-admin - type help for commands, exit to quit");

    loop {
        match rl.readline(&prompt(&ctx)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if handle_line(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = rl.save_history(path) {
            tracing::debug!(error = %e, "could not save shell history");
        }
    }
    Ok(())
}

/// Run one shell line. Returns true when the shell should exit.
fn handle_line(ctx: &Context, line: &str) -> bool {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return false;
        }
    };
    if matches!(words.first().map(String::as_str), Some("exit" | "quit")) {
        return true;
    }

    match ShellLine::try_parse_from(&words) {
        Ok(ShellLine {
            command: Command::Shell,
        }) => println!("Already in the shell"),
        Ok(parsed) => {
            if let Err(e) = run_once(ctx, parsed.command) {
                eprintln!("Error: {:#}", e);
            }
        }
        Err(e) => {
            let _ = e.print();
        }
    }
    false
}
