use serde_json::json;

use crate::config::Config;
use crate::db::connection;
use crate::error::FmsError;
use crate::output;

pub fn run(json_output: bool) -> i32 {
    super::finish(run_inner(json_output), json_output)
}

fn run_inner(json_output: bool) -> Result<i32, FmsError> {
    let path = connection::init_db()?;
    if let Some(dir) = path.parent() {
        Config::write_default(dir)?;
    }
    if json_output {
        output::json::print(&output::json::success(json!({ "path": path.to_string_lossy() })));
    } else {
        println!("Initialized fms at {}", path.display());
    }
    Ok(0)
}
