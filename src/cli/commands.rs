use clap::{Parser, Subcommand};

const VERSION: &str = env!("GIT_VERSION");

#[derive(Parser)]
#[command(
    name = "fms",
    version = VERSION,
    about = "Flow management: run templated multi-step workflows as projects",
    after_help = "\
NOTE:
  Data is stored at <root>/.fms/fms.db, where <root> is the nearest directory
  (walking up from the current one) containing `.fms`.
  Run `fms init` before any other command.

EXIT CODES:
  0  Success
  1  Error (not found, validation, illegal transition, etc.)
  3  Concurrency conflict (project changed since it was loaded; retry)

INSTANTS:
  RFC 3339 (2024-03-04T09:00:00Z), `YYYY-MM-DD HH:MM` or `YYYY-MM-DD` (UTC).

STEP FLOW:
  A task becomes active once every earlier task is done or terminated.
  fixed_offset tasks are scheduled from the project start; dependent_offset
  tasks get their due date when the predecessor finishes; ask_on_completion
  tasks wait for `task set-date` (or `task complete --due`)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Acting user (name or ID)
    #[arg(long, global = true)]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize fms in this directory
    Init,

    /// User management
    #[command(subcommand)]
    User(UserCommands),

    /// Workflow templates
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Project instances
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Task transitions within a project
    #[command(subcommand)]
    Task(TaskCommands),

    /// Date change, hold and terminate requests
    #[command(subcommand)]
    Objection(ObjectionCommands),

    /// Score audit log
    #[command(subcommand)]
    Score(ScoreCommands),

    /// Side-effect delivery queue
    #[command(subcommand)]
    Outbox(OutboxCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// Unique user name
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// List users
    List,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Load a template from stdin JSON
    #[command(after_help = "\
STDIN FORMAT:
  {\"name\":\"purchase\", \"shift_weekend\":true, \"approver\":\"boss\",
   \"steps\":[{\"seq\":1, \"description\":\"...\", \"assignees\":[\"alice\"],
     \"timing\":\"fixed_offset\", \"offset\":{\"unit\":\"days\",\"days\":2},
     \"checklist_required\":false, \"checklist\":[], \"trigger_template\":\"payment\"}]}

NOTE:
  timing: fixed_offset | dependent_offset | ask_on_completion
  offset units: hours {hours}, days {days}, days_hours {days, hours}
  Template names are unique; templates are never edited after loading.")]
    Load,
    /// List templates
    List,
    /// Show template details
    Show {
        /// Template name or ID
        reference: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Instantiate a project from a template (creator is --user)
    Start {
        /// Template name or ID
        template: String,
        /// Start instant (default: now)
        #[arg(long)]
        start: Option<String>,
        /// Project name (default: template name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List projects
    List,
    /// Show project details
    Show {
        /// Project code or ID (prefix allowed)
        reference: String,
    },
    /// Delete a project
    Delete {
        /// Project code or ID (prefix allowed)
        reference: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Start a task (pending → in_progress)
    Start {
        /// Project code or ID
        project: String,
        /// Step sequence number
        seq: u32,
        /// When the work started (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Complete a task (pending|in_progress → done)
    #[command(after_help = "\
NOTE:
  Completion scores the task, activates the next one and delivers the
  score log and any downstream trigger from the outbox.
  --due completes an active ask_on_completion task in one step.")]
    Complete {
        project: String,
        seq: u32,
        /// Checklist item ticked off (repeatable)
        #[arg(long = "check")]
        checked: Vec<String>,
        /// Attachment reference (repeatable)
        #[arg(long = "attach")]
        attachments: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Due date for an ask_on_completion task
        #[arg(long)]
        due: Option<String>,
        /// Completion instant (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Supply the due date of an ask_on_completion task
    SetDate {
        project: String,
        seq: u32,
        /// Due instant
        date: String,
    },
}

#[derive(Subcommand)]
pub enum ObjectionCommands {
    /// Raise an objection on a task (requester is --user)
    Raise {
        project: String,
        seq: u32,
        /// date_change | hold | terminate
        #[arg(long)]
        kind: String,
        /// Reason for the request
        #[arg(long)]
        remarks: String,
        /// Requested due date (date_change only)
        #[arg(long)]
        date: Option<String>,
    },
    /// Approve or reject a pending objection (approver is --user)
    Respond {
        project: String,
        seq: u32,
        /// Objection ID or prefix
        objection: String,
        /// approve | reject
        #[arg(long)]
        decision: String,
        #[arg(long)]
        remarks: Option<String>,
        /// Score the task against the revised date
        #[arg(long)]
        impact_score: bool,
    },
    /// Pending objections awaiting --user
    Pending,
}

#[derive(Subcommand)]
pub enum ScoreCommands {
    /// List score log entries
    List {
        /// Restrict to one project (code or ID)
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum OutboxCommands {
    /// List outbox rows
    List {
        /// pending | done | failed
        #[arg(long)]
        status: Option<String>,
    },
    /// Deliver pending rows now
    Drain,
}
