//! Local sign-in commands.

use crate::config::Config;
use crate::session::Session;

pub fn login(config: &Config, user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::login(&config.data_dir.value, user)?;
    if let Some(user_id) = session.user_id {
        println!("Signed in as {}", user_id);
    }
    Ok(())
}

pub fn logout(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match Session::logout(&config.data_dir.value)? {
        Some(user_id) => println!("Signed out {}", user_id),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub fn whoami(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match Session::load(&config.data_dir.value)?.user_id {
        Some(user_id) => println!("{}", user_id),
        None => println!("Not signed in. Use `shoplist login <USER>`."),
    }
    Ok(())
}
