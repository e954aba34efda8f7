//! Console CLI - subcommands for staff operations
//!
//! Each invocation is one short-lived session: locks taken by `note` and
//! `status` are released before the process exits.

use chrono::NaiveDate;
use clap::Subcommand;
use complaint_client::{
    Agency, Complaint, ComplaintStatus, CreateStaffInput, CreateUserInput, StaffRole,
    UpdateProfileInput, User,
};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::auth::{confirm_password_reset, request_password_reset, LoginOutcome};
use crate::console::Console;
use crate::dashboard::{percentage, DashboardData, DateRange};
use crate::editor::{validate_note, Affordance};
use crate::error::{ConsoleError, Result};
use crate::feed::LoadOutcome;
use crate::users::{role_display_name, UserFilters};

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "COMPLAINT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the stored session
    Logout,

    /// Browse and edit complaints
    #[command(subcommand)]
    Complaints(ComplaintCommands),

    /// Manage agencies
    #[command(subcommand)]
    Agencies(AgencyCommands),

    /// Manage user and staff accounts
    #[command(subcommand)]
    Users(UserCommands),

    /// Analytics dashboard
    #[command(subcommand)]
    Analytics(AnalyticsCommands),

    /// Password reset
    #[command(subcommand)]
    Password(PasswordCommands),
}

#[derive(Debug, Subcommand)]
pub enum ComplaintCommands {
    /// List complaints, one or more pages
    List {
        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u64,
    },

    /// Show one complaint
    Show { id: String },

    /// Lock a complaint and append a note
    Note { id: String, text: String },

    /// Lock a complaint and change its status
    Status {
        id: String,
        /// pending, in_progress, awaiting_info, resolved or rejected
        status: ComplaintStatus,
    },
}

#[derive(Debug, Subcommand)]
pub enum AgencyCommands {
    List,
    Show { id: String },
    Create { name: String },
}

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// List accounts
    List {
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        search: Option<String>,
    },

    /// Show the signed-in account
    Me,

    /// Create a regular user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a staff account
    CreateStaff {
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// staff_admin or complaint_staff
        #[arg(long)]
        role: StaffRole,
        #[arg(long)]
        agency_id: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },

    /// Update the signed-in account's profile
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Delete an account by ID
    Delete { id: String },

    /// Delete the signed-in account and sign out
    DeleteMe,
}

#[derive(Debug, Subcommand)]
pub enum AnalyticsCommands {
    /// Print the dashboard figures
    Summary {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Download the PDF report
    Report {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum PasswordCommands {
    /// Email a reset link
    Forgot { email: String },
    /// Set a new password with the emailed token
    Reset {
        token: String,
        #[arg(env = "COMPLAINT_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

/// Execute a CLI command, returning text for stdout
pub async fn execute_command(console: &Console, command: Commands) -> Result<String> {
    match command {
        Commands::Login { email, password } => match console.login().sign_in(&email, &password).await? {
            LoginOutcome::SignedIn(data) => Ok(format!(
                "Signed in as {} ({})",
                email,
                role_display_name(data.role.as_deref().unwrap_or_default())
            )),
            LoginOutcome::Ignored => Ok("Sign-in already in progress".to_string()),
        },

        Commands::Logout => {
            console.sign_out().await;
            Ok("Signed out".to_string())
        }

        Commands::Complaints(cmd) => execute_complaints(console, cmd).await,
        Commands::Agencies(cmd) => execute_agencies(console, cmd).await,
        Commands::Users(cmd) => execute_users(console, cmd).await,
        Commands::Analytics(cmd) => execute_analytics(console, cmd).await,

        Commands::Password(PasswordCommands::Forgot { email }) => {
            request_password_reset(console.client(), &email).await?;
            Ok("If the address is registered, a reset link has been sent".to_string())
        }
        Commands::Password(PasswordCommands::Reset { token, new_password }) => {
            confirm_password_reset(console.client(), &token, &new_password).await?;
            Ok("Password updated".to_string())
        }
    }
}

async fn execute_complaints(console: &Console, cmd: ComplaintCommands) -> Result<String> {
    match cmd {
        ComplaintCommands::List { pages } => {
            for i in 0..pages.max(1) {
                let report = console.load_complaints(i == 0).await?;
                if let Some(enrichment) = report.enrichment {
                    enrichment.finished().await;
                }
                if report.outcome == LoadOutcome::Exhausted {
                    break;
                }
            }
            let snapshot = console.feed().snapshot().await;
            let mut out = String::new();
            for complaint in &snapshot.items {
                let _ = writeln!(out, "{}", format_complaint_line(complaint));
            }
            let _ = write!(
                out,
                "Page {}/{} ({} complaints total)",
                snapshot.current_page, snapshot.total_pages, snapshot.total_items
            );
            Ok(out)
        }

        ComplaintCommands::Show { id } => {
            let mut complaint = console.complaint(&id).await?;
            if complaint.user.is_none() {
                complaint.user = console.feed().directory().resolve(&complaint.user_id).await.ok();
            }
            Ok(format_complaint_detail(&complaint))
        }

        ComplaintCommands::Note { id, text } => {
            // Checked before the lock so a bad note never touches the server
            validate_note(&text)?;
            let editor = console.editor();
            editor.begin_edit(&id, Affordance::AddNote).await?;
            match editor.submit_note(&id, &text).await {
                Ok(complaint) => Ok(format!("Note added to {} (version {})", complaint.id, complaint.version)),
                Err(err) => {
                    editor.cancel(&id).await;
                    Err(err)
                }
            }
        }

        ComplaintCommands::Status { id, status } => {
            let editor = console.editor();
            editor.begin_edit(&id, Affordance::ChangeStatus).await?;
            match editor.submit_status(&id, Some(status)).await {
                Ok(complaint) => Ok(format!(
                    "{} is now {} (version {})",
                    complaint.id, complaint.status, complaint.version
                )),
                Err(err) => {
                    editor.cancel(&id).await;
                    Err(err)
                }
            }
        }
    }
}

async fn execute_agencies(console: &Console, cmd: AgencyCommands) -> Result<String> {
    let mut agencies = console.agencies();
    match cmd {
        AgencyCommands::List => {
            let list = agencies.load().await?;
            Ok(list.iter().map(format_agency).collect::<Vec<_>>().join("\n"))
        }
        AgencyCommands::Show { id } => Ok(format_agency(&agencies.get(&id).await?)),
        AgencyCommands::Create { name } => {
            let agency = agencies.create(&name).await?;
            Ok(format!("Created {}", format_agency(&agency)))
        }
    }
}

async fn execute_users(console: &Console, cmd: UserCommands) -> Result<String> {
    let mut users = console.users();
    match cmd {
        UserCommands::List { role, active, search } => {
            users.set_filters(UserFilters { role, active, search });
            let list = users.load().await?;
            Ok(list.iter().map(format_user).collect::<Vec<_>>().join("\n"))
        }

        UserCommands::Me => match users.load_current_user().await {
            Some(user) => Ok(format_user(user)),
            None => Err(ConsoleError::NotFound("Could not load the signed-in user".into())),
        },

        UserCommands::Create {
            email,
            phone,
            first_name,
            last_name,
            password,
        } => {
            users.load_current_user().await;
            if !users.can_add_users() {
                return Err(ConsoleError::Forbidden("Your role cannot create users".into()));
            }
            let input = CreateUserInput {
                first_name,
                last_name,
                email,
                phone,
                password,
            };
            users.create_user(&input, None).await?;
            Ok(format!("Created user {}", input.email))
        }

        UserCommands::CreateStaff {
            email,
            phone,
            role,
            agency_id,
            first_name,
            last_name,
        } => {
            users.load_current_user().await;
            if !users.can_add_users() {
                return Err(ConsoleError::Forbidden("Your role cannot create staff".into()));
            }
            let input = CreateStaffInput {
                first_name,
                last_name,
                email,
                phone,
                target_role: role,
                agency_id,
            };
            let staff = users.create_staff(&input).await?;
            Ok(format!("Created {}", format_user(&staff)))
        }

        UserCommands::Delete { id } => {
            users.load().await?;
            let Some(user) = users.users().iter().find(|u| u.id == id).cloned() else {
                return Err(ConsoleError::NotFound(format!("User {} not found", id)));
            };
            users.delete_user(&user).await?;
            Ok(format!("Deleted {}", user.email))
        }

        UserCommands::UpdateProfile {
            first_name,
            last_name,
            phone,
        } => {
            let input = UpdateProfileInput {
                first_name,
                last_name,
                phone,
            };
            let user = users.update_profile(&input, None).await?;
            Ok(format!("Updated {}", format_user(&user)))
        }

        UserCommands::DeleteMe => {
            console.client().delete_me().await?;
            console.sign_out().await;
            Ok("Account deleted".to_string())
        }
    }
}

async fn execute_analytics(console: &Console, cmd: AnalyticsCommands) -> Result<String> {
    match cmd {
        AnalyticsCommands::Summary { from, to } => {
            let data = console.dashboard(&DateRange::new(from, to)).await;
            Ok(format_dashboard(&data))
        }
        AnalyticsCommands::Report { from, to, out } => {
            let (filename, bytes) = console.report(&DateRange::new(from, to)).await?;
            let path = out.join(filename);
            std::fs::write(&path, &bytes)
                .map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))?;
            Ok(format!("Saved {} ({} bytes)", path.display(), bytes.len()))
        }
    }
}

fn format_complaint_line(complaint: &Complaint) -> String {
    let submitter = complaint
        .user
        .as_ref()
        .map(|u| u.display_name())
        .unwrap_or_else(|| complaint.user_id.clone());
    format!(
        "{:<12} {:<14} v{:<3} {} [{}] by {}",
        complaint.id,
        complaint.status,
        complaint.version,
        complaint.title,
        complaint.complaint_type.label(),
        submitter
    )
}

fn format_complaint_detail(complaint: &Complaint) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", complaint.title, complaint.id);
    let _ = writeln!(out, "  Status:    {}", complaint.status);
    let _ = writeln!(out, "  Version:   {}", complaint.version);
    let _ = writeln!(out, "  Type:      {}", complaint.complaint_type.label());
    let _ = writeln!(out, "  Location:  {}", complaint.location);
    if let Some(agency) = &complaint.agency {
        let _ = writeln!(out, "  Agency:    {}", agency.name);
    }
    if let Some(user) = &complaint.user {
        let _ = writeln!(out, "  Submitter: {}", user.display_name());
    }
    let _ = writeln!(out, "  Updated:   {}", complaint.updated_at.format("%Y-%m-%d %H:%M"));
    for file in &complaint.files {
        let _ = writeln!(out, "  File:      {} ({})", file.link, file.mime_type);
    }
    let _ = write!(out, "\n{}", complaint.description);
    out
}

fn format_agency(agency: &Agency) -> String {
    format!("{:<24} {}", agency.id, agency.name)
}

fn format_user(user: &User) -> String {
    format!(
        "{:<24} {:<32} {:<16} {}",
        user.id,
        user.email,
        role_display_name(&user.role),
        if user.is_active { "active" } else { "inactive" }
    )
}

fn format_dashboard(data: &DashboardData) -> String {
    let mut out = String::new();
    if let Some(error) = &data.error {
        let _ = writeln!(out, "! {}", error);
    }
    if let Some(perf) = &data.performance {
        let _ = writeln!(
            out,
            "Requests: {}  Errors: {}  Success: {:.1}%  Avg response: {:.0}ms",
            perf.total_requests, perf.total_errors, perf.success_rate, perf.average_response_time
        );
    }
    if let Some(res) = &data.resolution {
        let _ = writeln!(
            out,
            "Resolution (days): avg {:.1}  median {:.1}  min {:.1}  max {:.1}  ({} resolved)",
            res.average_time_in_days,
            res.median_time_in_days,
            res.min_time_in_days,
            res.max_time_in_days,
            res.total_resolved
        );
    }

    let total = data.status_total();
    if !data.status_chart.is_empty() {
        let _ = writeln!(out, "By status:");
        for point in &data.status_chart {
            let _ = writeln!(
                out,
                "  {:<16} {:>6}  {:>5.1}%",
                point.label,
                point.value,
                percentage(point.value, total)
            );
        }
    }
    if !data.agency_chart.is_empty() {
        let _ = writeln!(out, "Top agencies:");
        for point in &data.agency_chart {
            let _ = writeln!(out, "  {:<32} {:>6}", point.label, point.value);
        }
    }
    if !data.type_chart.is_empty() {
        let _ = writeln!(out, "By type:");
        for point in &data.type_chart {
            let _ = writeln!(out, "  {:<32} {:>6}", point.label, point.value);
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::gateway::mock::sample_complaint;
    use crate::gateway::{MockGateway, MockOp};
    use complaint_client::{ApiClient, Session};
    use std::sync::Arc;

    fn console_with(gateway: Arc<MockGateway>) -> Console {
        let client = ApiClient::new(Default::default(), Session::new()).unwrap();
        Console::with_gateway(ConsoleConfig::default(), client, gateway)
    }

    #[tokio::test]
    async fn test_short_note_is_rejected_before_locking() {
        let gateway = Arc::new(MockGateway::new().with_complaints(vec![sample_complaint("c1", "u1")]));
        let console = console_with(gateway.clone());

        let command = Commands::Complaints(ComplaintCommands::Note {
            id: "c1".into(),
            text: "abc".into(),
        });
        let err = execute_command(&console, command).await.unwrap_err();

        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(gateway.calls(MockOp::Get), 0);
        assert_eq!(gateway.total_calls(), 0);
        assert!(!console.locks().is_held("c1").await);
    }

    #[tokio::test]
    async fn test_note_locks_submits_and_releases() {
        let gateway = Arc::new(MockGateway::new().with_complaints(vec![sample_complaint("c1", "u1")]));
        let console = console_with(gateway.clone());

        let command = Commands::Complaints(ComplaintCommands::Note {
            id: "c1".into(),
            text: "Crew dispatched".into(),
        });
        let output = execute_command(&console, command).await.unwrap();

        assert_eq!(output, "Note added to c1 (version 2)");
        assert_eq!(gateway.calls(MockOp::Get), 1);
        assert_eq!(gateway.calls(MockOp::Note), 1);
        assert!(!console.locks().is_held("c1").await);
    }
}
