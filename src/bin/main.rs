use anyhow::{bail, Context, Error};
use serde::Serialize;
use skillchecker::{
    endpoints,
    routes::{self, Navigation, RouteTable},
    types::{
        Attachment, Evaluation, EvidenceSubmission, NewSkill, NewStudent,
        ProfileUpdate, SkillUpdate, StudentUpdate,
    },
    validation::{LoginForm, RegisterForm},
    ApiClient, Config, FileStorage, LogNavigator, Navigator, Role,
    SessionStore,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Starting against {}", args.api_url);

    if let Err(e) = run(args).await {
        // errors are shown as a single notification line
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let config = args.config()?;
    log::debug!("Using {:#?}", config);

    let session =
        Arc::new(SessionStore::new(FileStorage::new(&config.storage_dir)));
    let navigator = Arc::new(LogNavigator);
    let client =
        ApiClient::new(&config, Arc::clone(&session), navigator.clone())?;
    let app = App {
        client,
        navigator,
        routes: RouteTable::default(),
    };

    app.handle(args.cmd).await
}

struct App {
    client: ApiClient,
    navigator: Arc<LogNavigator>,
    routes: RouteTable,
}

impl App {
    fn session(&self) -> &SessionStore { self.client.session() }

    /// Run the route guard for a view, the way a browser would before
    /// rendering it.
    fn open(&self, location: &str) -> Result<(), Error> {
        match self.routes.navigate(&self.session().snapshot(), location) {
            Navigation::Render { view, .. } => {
                log::debug!("Rendering {:?} for {}", view, location);
                Ok(())
            },
            Navigation::Redirect(redirect) => {
                self.navigator.navigate(&redirect.to);
                match redirect.from {
                    Some(_) => bail!("Please log in to view {}", location),
                    None => bail!(
                        "You don't have access to {}, try {}",
                        location,
                        redirect.to
                    ),
                }
            },
        }
    }

    async fn handle(&self, cmd: Command) -> Result<(), Error> {
        let client = &self.client;

        match cmd {
            Command::Login {
                email,
                password,
                from,
            } => {
                let form = LoginForm { email, password };
                form.validate()?;

                let (email, password) = (&form.email, &form.password);
                let user = endpoints::login_and_store(client, email, password)
                    .await
                    .map_err(|e| {
                        anyhow::anyhow!("Login failed: {}", e.user_message())
                    })?;

                println!("Welcome back! Logged in as {}", user.name);
                self.navigator
                    .navigate(&routes::after_login(from.as_deref(), user.role));
            },
            Command::Register {
                name,
                email,
                password,
                confirm_password,
                role,
            } => {
                let form = RegisterForm {
                    name,
                    email,
                    confirm_password: confirm_password
                        .unwrap_or_else(|| password.clone()),
                    password,
                    role,
                };
                let registration = form.into_registration()?;

                endpoints::register(client, &registration).await?;
                println!("Account created! Please log in to continue.");
                self.navigator.navigate(routes::LOGIN_PATH);
            },
            Command::Logout => {
                self.session().logout();
                self.navigator.navigate(routes::LOGIN_PATH);
            },
            Command::Whoami => match self.session().user() {
                Some(user) => print_json(&user)?,
                None => println!("Not logged in"),
            },
            Command::Open { location } => {
                self.open(&location)?;
                println!("{}", location);
            },
            Command::Dashboard => self.dashboard().await?,
            Command::Profile {
                name,
                department,
                bio,
            } => {
                self.open("/student/profile")?;
                let update = ProfileUpdate {
                    name,
                    department,
                    bio,
                };

                if update == ProfileUpdate::default() {
                    print_json(&endpoints::profile(client).await?)?;
                } else {
                    endpoints::update_profile(client, &update).await?;
                    println!("Profile updated");
                }
            },
            Command::Competency => {
                self.open("/student/competency")?;
                print_json(&endpoints::competency(client).await?)?;
            },
            Command::Evidence {
                skill_id,
                description,
                file,
            } => {
                self.open("/student/evidence")?;
                let file = match file {
                    Some(path) => Some(read_attachment(&path)?),
                    None => None,
                };
                let submission = EvidenceSubmission {
                    skill_id,
                    description,
                    file,
                };

                endpoints::submit_evidence(client, &submission).await?;
                println!("Evidence submitted");
            },
            Command::Skills { id: Some(id) } => {
                print_json(&endpoints::get_skill(client, id).await?)?
            },
            Command::Skills { id: None } => {
                print_json(&endpoints::list_skills(client).await?)?
            },
            Command::Students(cmd) => {
                self.open("/admin/students")?;
                self.students(cmd).await?;
            },
            Command::Skill(cmd) => {
                self.open("/admin/skills")?;
                self.skill(cmd).await?;
            },
            Command::Evaluate {
                student_id,
                skill_id,
                score,
                feedback,
            } => {
                self.open("/admin/evaluate")?;
                let evaluation = Evaluation {
                    skill_id,
                    score,
                    feedback,
                };

                endpoints::evaluate_student(client, student_id, &evaluation)
                    .await?;
                println!("Evaluation recorded");
            },
            Command::TopStudents { limit } => {
                self.open("/admin/analytics")?;
                print_json(&endpoints::top_students(client, limit).await?)?;
            },
            Command::SkillSummary => {
                self.open("/admin/analytics")?;
                print_json(&endpoints::skill_summary(client).await?)?;
            },
        }

        Ok(())
    }

    async fn dashboard(&self) -> Result<(), Error> {
        let role = match self.session().user() {
            Some(user) => user.role,
            None => {
                return self.open(Role::Student.landing_path());
            },
        };
        self.open(role.landing_path())?;

        match role {
            Role::Student => {
                let dashboard =
                    endpoints::student_dashboard(&self.client).await;
                show_section("Competency", dashboard.competency)?;
                show_section("Skills", dashboard.skills)?;
            },
            Role::Admin => {
                let dashboard = endpoints::admin_dashboard(&self.client).await;
                show_section("Top students", dashboard.top_students)?;
                show_section("Skill summary", dashboard.skill_summary)?;
            },
        }

        Ok(())
    }

    async fn students(&self, cmd: StudentCommand) -> Result<(), Error> {
        let client = &self.client;

        match cmd {
            StudentCommand::Create {
                name,
                email,
                password,
                department,
            } => {
                let student = NewStudent {
                    name,
                    email,
                    password,
                    department,
                };
                endpoints::create_student(client, &student).await?;
                println!("Student created");
            },
            StudentCommand::Update {
                id,
                name,
                email,
                department,
            } => {
                let update = StudentUpdate {
                    name,
                    email,
                    department,
                };
                endpoints::update_student(client, id, &update).await?;
                println!("Student {} updated", id);
            },
            StudentCommand::Delete { id } => {
                endpoints::delete_student(client, id).await?;
                println!("Student {} deleted", id);
            },
        }

        Ok(())
    }

    async fn skill(&self, cmd: SkillCommand) -> Result<(), Error> {
        let client = &self.client;

        match cmd {
            SkillCommand::Create {
                name,
                description,
                category,
                max_level,
            } => {
                let skill = NewSkill {
                    name,
                    description,
                    category,
                    max_level,
                };
                endpoints::create_skill(client, &skill).await?;
                println!("Skill created");
            },
            SkillCommand::Update {
                id,
                name,
                description,
                category,
            } => {
                let update = SkillUpdate {
                    name,
                    description,
                    category,
                };
                endpoints::update_skill(client, id, &update).await?;
                println!("Skill {} updated", id);
            },
        }

        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print one part of a dashboard. A failing part is reported without hiding
/// the others.
fn show_section<T: Serialize>(
    title: &str,
    outcome: Result<T, skillchecker::ApiError>,
) -> Result<(), Error> {
    println!("== {} ==", title);

    match outcome {
        Ok(value) => print_json(&value),
        Err(e) if e.is_unauthorized() => Err(e.into()),
        Err(e) => {
            eprintln!("Unable to load {}: {}", title.to_lowercase(), e);
            Ok(())
        },
    }
}

fn read_attachment(path: &Path) -> Result<Attachment, Error> {
    let contents = std::fs::read(path)
        .with_context(|| format!("Unable to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("evidence"));

    Ok(Attachment {
        filename,
        mime_type: None,
        contents,
    })
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Track and evaluate student skills from the terminal")]
struct Args {
    #[structopt(
        long = "api-url",
        env = "SKILLCHECKER_API_URL",
        default_value = "http://localhost:8080/api",
        help = "The backend's base URL"
    )]
    api_url: String,
    #[structopt(
        long = "home",
        env = "SKILLCHECKER_HOME",
        parse(from_os_str),
        help = "Where to keep the session between runs"
    )]
    home: Option<PathBuf>,
    #[structopt(
        long = "timeout",
        default_value = "10",
        help = "Request timeout in seconds"
    )]
    timeout: u64,
    #[structopt(subcommand)]
    cmd: Command,
}

impl Args {
    fn config(&self) -> Result<Config, Error> {
        let mut config = Config::new(&self.api_url)?
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(home) = &self.home {
            config = config.with_storage_dir(home);
        }

        Ok(config)
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Log in and remember the session")]
    Login {
        #[structopt(short = "e", long = "email", help = "Your email address")]
        email: String,
        #[structopt(
            short = "p",
            long = "password",
            env = "SKILLCHECKER_PASSWORD",
            hide_env_values = true,
            help = "Your password"
        )]
        password: String,
        #[structopt(long = "from", help = "Where to go after logging in")]
        from: Option<String>,
    },
    #[structopt(about = "Create a new account")]
    Register {
        #[structopt(long = "name")]
        name: String,
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
        #[structopt(long = "confirm-password")]
        confirm_password: Option<String>,
        #[structopt(long = "role", help = "ADMIN or STUDENT")]
        role: Option<Role>,
    },
    #[structopt(about = "Forget the current session")]
    Logout,
    #[structopt(about = "Show who is logged in")]
    Whoami,
    #[structopt(about = "Check whether a view may be opened")]
    Open { location: String },
    #[structopt(about = "Show the dashboard for your role")]
    Dashboard,
    #[structopt(about = "Show or edit your profile")]
    Profile {
        #[structopt(long = "name")]
        name: Option<String>,
        #[structopt(long = "department")]
        department: Option<String>,
        #[structopt(long = "bio")]
        bio: Option<String>,
    },
    #[structopt(about = "Show your competencies")]
    Competency,
    #[structopt(about = "Submit evidence for a skill")]
    Evidence {
        #[structopt(long = "skill")]
        skill_id: i64,
        #[structopt(short = "d", long = "description")]
        description: String,
        #[structopt(long = "file", parse(from_os_str))]
        file: Option<PathBuf>,
    },
    #[structopt(about = "Browse the skills catalog")]
    Skills { id: Option<i64> },
    #[structopt(about = "Manage students")]
    Students(StudentCommand),
    #[structopt(about = "Manage skills")]
    Skill(SkillCommand),
    #[structopt(about = "Score a student's skill")]
    Evaluate {
        #[structopt(long = "student")]
        student_id: i64,
        #[structopt(long = "skill")]
        skill_id: i64,
        #[structopt(long = "score")]
        score: f64,
        #[structopt(long = "feedback")]
        feedback: Option<String>,
    },
    #[structopt(about = "List the best performing students")]
    TopStudents {
        #[structopt(long = "limit")]
        limit: Option<u32>,
    },
    #[structopt(about = "Show score statistics for every skill")]
    SkillSummary,
}

#[derive(Debug, StructOpt)]
enum StudentCommand {
    Create {
        #[structopt(long = "name")]
        name: String,
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
        #[structopt(long = "department")]
        department: Option<String>,
    },
    Update {
        id: i64,
        #[structopt(long = "name")]
        name: Option<String>,
        #[structopt(short = "e", long = "email")]
        email: Option<String>,
        #[structopt(long = "department")]
        department: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Debug, StructOpt)]
enum SkillCommand {
    Create {
        #[structopt(long = "name")]
        name: String,
        #[structopt(long = "description")]
        description: Option<String>,
        #[structopt(long = "category")]
        category: Option<String>,
        #[structopt(long = "max-level")]
        max_level: Option<u32>,
    },
    Update {
        id: i64,
        #[structopt(long = "name")]
        name: Option<String>,
        #[structopt(long = "description")]
        description: Option<String>,
        #[structopt(long = "category")]
        category: Option<String>,
    },
}
