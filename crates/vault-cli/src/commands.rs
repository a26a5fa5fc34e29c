//! Subcommands

use clap::Subcommand;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use vault_core::{
    duplicate_urls, DuplicateUrls, Hydration, KeyValueStore, Record, SettingsManager, Vault,
    VaultCollection, DEFAULT_ITERATIONS,
};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set the master password for a new vault
    Init {
        /// PBKDF2 round count
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,
    },
    /// Unlock with the master password and cache the key for later commands
    Unlock,
    /// Forget the cached key
    Logout,
    /// Show whether the vault is provisioned and unlocked
    Status,
    /// List records
    List,
    /// Show one record, including its secret
    Show { id: String },
    /// Add a record
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long, default_value = "")]
        description: String,
        /// URL for the record (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,
    },
    /// Edit a record
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replacement URL list (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,
        /// Remove all URLs
        #[arg(long, conflicts_with = "urls")]
        clear_urls: bool,
    },
    /// Delete a record
    Delete { id: String },
    /// Report URLs shared by more than one record
    CheckUrls,
}

/// Where the vault lives and how to get the master password
pub struct Context {
    data_dir: PathBuf,
    password: Option<String>,
    /// Holds the cached key instead of the data directory when set
    key_store: Option<Arc<dyn KeyValueStore>>,
}

impl Context {
    pub fn new(data_dir: PathBuf, password: Option<String>) -> Self {
        Self {
            data_dir,
            password,
            key_store: None,
        }
    }

    pub fn with_key_store(mut self, key_store: Arc<dyn KeyValueStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    fn open_vault(&self) -> vault_core::Result<Vault> {
        match &self.key_store {
            Some(key_store) => Vault::open_with_key_store(&self.data_dir, key_store.clone()),
            None => Vault::open(&self.data_dir),
        }
    }

    fn password(&self, prompt: &str) -> std::io::Result<String> {
        match &self.password {
            Some(password) => Ok(password.clone()),
            None => rpassword::prompt_password(prompt),
        }
    }
}

pub async fn run(command: Command, context: &Context, out: &mut impl Write) -> CliResult {
    if let Command::Init { iterations } = command {
        return init(context, iterations, out).await;
    }

    let vault = context.open_vault()?;

    match command {
        Command::Init { .. } => unreachable!("handled above"),
        Command::Unlock => {
            let password = context.password("Master password: ")?;
            let hydration = vault.unlock(&password).await?;
            report_hydration(&hydration, out)?;
            writeln!(out, "Vault unlocked")?;
        }
        Command::Logout => {
            vault.logout().await?;
            writeln!(out, "Vault locked")?;
        }
        Command::Status => {
            let settings = SettingsManager::new(&context.data_dir)?;
            writeln!(out, "Storage: {}", vault.backend_name())?;
            writeln!(out, "Key storage: {}", vault.key_backend_name())?;
            if !settings.get().is_provisioned() {
                writeln!(out, "Status: not initialized")?;
            } else if vault.resume().await?.is_some() {
                writeln!(out, "Status: unlocked")?;
            } else {
                writeln!(out, "Status: locked")?;
            }
        }
        Command::List => {
            ensure_unlocked(&vault, context, out).await?;
            let records = vault.list().await?;
            if records.is_empty() {
                writeln!(out, "No records")?;
            }
            for record in &records {
                writeln!(out, "{}  {}  {}", record.id, record.name, record.url.join(", "))?;
            }
        }
        Command::Show { id } => {
            ensure_unlocked(&vault, context, out).await?;
            let record = vault
                .get(&id)
                .await?
                .ok_or_else(|| format!("No record with id {}", id))?;
            print_record(&record, out)?;
        }
        Command::Add {
            name,
            value,
            description,
            urls,
        } => {
            ensure_unlocked(&vault, context, out).await?;
            let record = Record::new(Uuid::new_v4().to_string(), name, value)
                .with_description(description)
                .with_urls(urls);
            let id = record.id.clone();

            let duplicates = vault.check_update(&record).await?;
            vault.create(record).await?;

            info!("Added record {}", id);
            writeln!(out, "Added {}", id)?;
            report_duplicates(&duplicates, &vault.list().await?, out)?;
        }
        Command::Edit {
            id,
            name,
            value,
            description,
            urls,
            clear_urls,
        } => {
            ensure_unlocked(&vault, context, out).await?;
            let mut record = vault
                .get(&id)
                .await?
                .ok_or_else(|| format!("No record with id {}", id))?;

            if let Some(name) = name {
                record = record.with_name(name);
            }
            if let Some(value) = value {
                record = record.with_value(value);
            }
            if let Some(description) = description {
                record = record.with_description(description);
            }
            if clear_urls || !urls.is_empty() {
                record = record.with_urls(urls);
            }

            let duplicates = vault.update(record).await?;

            writeln!(out, "Updated {}", id)?;
            report_duplicates(&duplicates, &vault.list().await?, out)?;
        }
        Command::Delete { id } => {
            ensure_unlocked(&vault, context, out).await?;
            if vault.delete(&id).await? {
                writeln!(out, "Deleted {}", id)?;
            } else {
                writeln!(out, "No record with id {}", id)?;
            }
        }
        Command::CheckUrls => {
            ensure_unlocked(&vault, context, out).await?;
            let records = vault.list().await?;
            let duplicates = duplicate_urls(&records);
            if duplicates.is_empty() {
                writeln!(out, "No duplicate URLs")?;
            }
            report_duplicates(&duplicates, &records, out)?;
        }
    }

    Ok(())
}

async fn init(context: &Context, iterations: u32, out: &mut impl Write) -> CliResult {
    std::fs::create_dir_all(&context.data_dir)?;
    let mut settings = SettingsManager::new(&context.data_dir)?;

    if settings.get().is_provisioned() {
        return Err("Vault already initialized".into());
    }

    let password = context.password("New master password: ")?;
    if context.password.is_none() {
        let confirmation = rpassword::prompt_password("Repeat master password: ")?;
        if confirmation != password {
            return Err("Passwords do not match".into());
        }
    }

    let canary = Vault::provision(&password, iterations).await?;
    settings.set_kdf_iterations(iterations).await?;
    settings.set_canary(canary).await?;

    writeln!(out, "Vault initialized in {}", context.data_dir.display())?;
    Ok(())
}

/// Resume from the cached key, or unlock with the master password
async fn ensure_unlocked(vault: &Vault, context: &Context, out: &mut impl Write) -> CliResult {
    if vault.resume().await?.is_some() {
        return Ok(());
    }

    let password = context.password("Master password: ")?;
    let hydration = vault.unlock(&password).await?;
    report_hydration(&hydration, out)
}

fn report_hydration(hydration: &Hydration, out: &mut impl Write) -> CliResult {
    if let Hydration::Corrupted(e) = hydration {
        writeln!(
            out,
            "Warning: stored records could not be read ({}); starting with an empty vault",
            e
        )?;
    }
    Ok(())
}

fn report_duplicates(
    duplicates: &DuplicateUrls,
    records: &VaultCollection,
    out: &mut impl Write,
) -> CliResult {
    for line in duplicates.describe(records) {
        writeln!(out, "Warning: {}", line)?;
    }
    Ok(())
}

fn print_record(record: &Record, out: &mut impl Write) -> CliResult {
    let timestamp = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    writeln!(out, "id:            {}", record.id)?;
    writeln!(out, "name:          {}", record.name)?;
    writeln!(out, "description:   {}", or_dash(&record.description))?;
    writeln!(out, "value:         {}", or_dash(&record.value))?;
    writeln!(out, "url:           {}", or_dash(&record.url.join(", ")))?;
    writeln!(out, "created:       {}", timestamp(record.created_at))?;
    writeln!(out, "last modified: {}", timestamp(record.last_modified_at))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vault_core::{FileStore, MemoryStore};

    const TEST_ITERATIONS: u32 = 1000;

    fn test_context(dir: &TempDir, password: &str) -> Context {
        Context::new(dir.path().to_path_buf(), Some(password.to_string()))
    }

    async fn run_ok(command: Command, context: &Context) -> String {
        let mut out = Vec::new();
        run(command, context, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    async fn init_vault(dir: &TempDir) -> Context {
        let context = test_context(dir, "correct-horse");
        run_ok(
            Command::Init {
                iterations: TEST_ITERATIONS,
            },
            &context,
        )
        .await;
        context
    }

    fn add(name: &str, url: &str) -> Command {
        Command::Add {
            name: name.to_string(),
            value: "secret".to_string(),
            description: String::new(),
            urls: vec![url.to_string()],
        }
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let context = init_vault(&dir).await;

        let mut out = Vec::new();
        let result = run(
            Command::Init {
                iterations: TEST_ITERATIONS,
            },
            &context,
            &mut out,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_add_list_and_show() {
        let dir = TempDir::new().unwrap();
        let context = init_vault(&dir).await;

        let output = run_ok(add("GitHub", "https://github.com"), &context).await;
        let id = output.trim().strip_prefix("Added ").unwrap().to_string();

        let listing = run_ok(Command::List, &context).await;
        assert!(listing.contains("GitHub"));
        assert!(listing.contains("https://github.com"));
        assert!(!listing.contains("secret"));

        let shown = run_ok(Command::Show { id }, &context).await;
        assert!(shown.contains("value:         secret"));
    }

    #[tokio::test]
    async fn test_duplicate_url_warning() {
        let dir = TempDir::new().unwrap();
        let context = init_vault(&dir).await;

        run_ok(add("GitHub", "https://github.com"), &context).await;
        let output = run_ok(add("GitHub work", "https://github.com"), &context).await;

        assert!(output.contains(
            r#"Warning: Duplicate url https://github.com found for passwords "GitHub", "GitHub work"."#
        ));

        let report = run_ok(Command::CheckUrls, &context).await;
        assert!(report.contains("Duplicate url https://github.com"));
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let dir = TempDir::new().unwrap();
        let context = init_vault(&dir).await;

        let output = run_ok(add("GitHub", "https://github.com"), &context).await;
        let id = output.trim().strip_prefix("Added ").unwrap().to_string();

        run_ok(
            Command::Edit {
                id: id.clone(),
                name: Some("GitLab".to_string()),
                value: None,
                description: None,
                urls: Vec::new(),
                clear_urls: true,
            },
            &context,
        )
        .await;

        let shown = run_ok(Command::Show { id: id.clone() }, &context).await;
        assert!(shown.contains("name:          GitLab"));
        assert!(shown.contains("url:           -"));
        assert!(!shown.contains("last modified: -"));

        let deleted = run_ok(Command::Delete { id: id.clone() }, &context).await;
        assert_eq!(deleted.trim(), format!("Deleted {}", id));

        let listing = run_ok(Command::List, &context).await;
        assert_eq!(listing.trim(), "No records");
    }

    #[tokio::test]
    async fn test_logout_requires_password_again() {
        let dir = TempDir::new().unwrap();
        let context = init_vault(&dir).await;

        run_ok(Command::Unlock, &context).await;
        assert!(run_ok(Command::Status, &context).await.contains("Status: unlocked"));

        run_ok(Command::Logout, &context).await;
        assert!(run_ok(Command::Status, &context).await.contains("Status: locked"));

        let wrong = test_context(&dir, "battery-staple");
        let mut out = Vec::new();
        let result = run(Command::List, &wrong, &mut out).await;
        assert_eq!(result.unwrap_err().to_string(), "Invalid password");
    }

    #[tokio::test]
    async fn test_cached_key_in_separate_store() {
        let dir = TempDir::new().unwrap();
        let key_store = Arc::new(MemoryStore::new());
        let context = init_vault(&dir).await.with_key_store(key_store.clone());

        run_ok(Command::Unlock, &context).await;
        assert!(key_store.get("crypto-key").await.unwrap().is_some());

        let files = FileStore::with_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(files.get("crypto-key").await.unwrap(), None);

        // Later commands resume from the key store without the password
        let no_password =
            Context::new(dir.path().to_path_buf(), None).with_key_store(key_store.clone());
        let status = run_ok(Command::Status, &no_password).await;
        assert!(status.contains("Key storage: In-Memory Storage"));
        assert!(status.contains("Status: unlocked"));

        run_ok(Command::Logout, &context).await;
        assert!(key_store.is_empty().await);
    }

    #[tokio::test]
    async fn test_status_before_init() {
        let dir = TempDir::new().unwrap();
        let context = test_context(&dir, "correct-horse");

        let status = run_ok(Command::Status, &context).await;
        assert!(status.contains("Status: not initialized"));
    }
}
