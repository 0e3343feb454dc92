use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Synchronize the collaborators of one repository with GitHub")]
    Sync {
        #[arg(long, value_name = "OWNER/NAME")]
        repo: String,
    },
    #[command(
        about = "Synchronize every tracked repository",
        long_about = "Synchronize every tracked repository in name order. A failing repository is reported and the remaining ones are still synchronized."
    )]
    SyncAll,
    #[command(about = "List the stored collaborators of a repository")]
    List {
        #[arg(long, value_name = "OWNER/NAME")]
        repo: String,
    },
    #[command(about = "Remove one collaborator from one repository")]
    Disconnect {
        #[arg(long, value_name = "OWNER/NAME")]
        repo: String,
        #[arg(long, value_name = "LOGIN")]
        login: String,
    },
    #[command(about = "Register a repository and mark it as tracked")]
    Track {
        #[arg(long, value_name = "OWNER/NAME")]
        repo: String,
    },
    #[command(about = "Stop tracking a repository; its collaborators are kept")]
    Untrack {
        #[arg(long, value_name = "OWNER/NAME")]
        repo: String,
    },
}
