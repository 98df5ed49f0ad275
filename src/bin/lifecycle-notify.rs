use clap::{Parser, Subcommand};

use lifecycle_notifier::notify::{NotificationMessage, Notifier, NotifyError, NOTIFY_SOCKET_ENV};

#[derive(Parser)]
#[command(name = "lifecycle-notify")]
#[command(about = "Send a single lifecycle notification to the supervisor", long_about = None)]
struct Cli {
    /// Environment variable holding the supervisor socket address.
    #[arg(long, default_value = NOTIFY_SOCKET_ENV)]
    socket_env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// READY=1
    Ready,
    /// RELOADING=1 with the current monotonic time
    Reloading,
    /// STOPPING=1
    Stopping,
    /// DEBUG=1
    Debug,
    /// STATUS=<text>
    Status { text: String },
    /// MAINPID=<pid>, defaulting to the parent process
    MainPid { pid: Option<u32> },
    /// Arbitrary KEY=VALUE fields sent as one message
    Send {
        #[arg(required = true)]
        fields: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let notifier = Notifier::with_socket_env(cli.socket_env);

    if std::env::var_os(notifier.socket_env()).is_none() {
        eprintln!("{} is not set; nothing will be sent", notifier.socket_env());
    }

    let result = match cli.command {
        Commands::Ready => notifier.ready(),
        Commands::Reloading => notifier.reloading(),
        Commands::Stopping => notifier.stopping(),
        Commands::Debug => notifier.debug_enabled(),
        Commands::Status { text } => notifier.status(&text),
        Commands::MainPid { pid } => notifier.main_pid(pid.unwrap_or_else(std::os::unix::process::parent_id)),
        Commands::Send { fields } => build(&fields).and_then(|message| notifier.send(&message)),
    };

    result.map_err(Into::into)
}

fn build(fields: &[String]) -> Result<NotificationMessage, NotifyError> {
    fields
        .iter()
        .try_fold(NotificationMessage::builder(), |builder, field| builder.assignment(field))?
        .build()
}
