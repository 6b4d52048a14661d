use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::normalize::parse_timezone;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, timezone: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(tz) = timezone {
        settings.timezone = parse_timezone(&tz)?.name().to_string();
    }

    save_settings(&settings)?;

    let resolved = settings.data_path();
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!("Initialized momo at {} ({})", resolved.display(), settings.timezone);
    Ok(())
}
