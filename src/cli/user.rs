use serde_json::json;

use crate::cli::commands::UserCommands;
use crate::db::{connection, user_repo};
use crate::error::FmsError;
use crate::output;

pub fn run(cmd: UserCommands, json_output: bool) -> i32 {
    let result = match cmd {
        UserCommands::Add { name, email } => run_add(&name, email.as_deref(), json_output),
        UserCommands::List => run_list(json_output),
    };
    super::finish(result, json_output)
}

fn run_add(name: &str, email: Option<&str>, json_output: bool) -> Result<i32, FmsError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FmsError::validation("User name is required"));
    }
    let conn = connection::open_db()?;
    let user = user_repo::create_user(&conn, &ulid::Ulid::new().to_string(), name, email)?;
    if json_output {
        output::json::print(&output::json::success(json!({
            "user": output::json::user_json(&user)
        })));
    } else {
        println!("Added user: {} ({})", user.name, user.id);
    }
    Ok(0)
}

fn run_list(json_output: bool) -> Result<i32, FmsError> {
    let conn = connection::open_db()?;
    let users = user_repo::list_users(&conn)?;
    if json_output {
        let users_json: Vec<_> = users.iter().map(output::json::user_json).collect();
        output::json::print(&output::json::success(json!({ "users": users_json })));
    } else {
        output::text::print_user_list(&users);
    }
    Ok(0)
}
