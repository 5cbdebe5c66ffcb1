use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use trace_authz::{
    auth::{format_permission, ModulePermission, User},
    config, load_resolver, Action, Module, PermissionResolver,
};

/// Inspect permission decisions for a user snapshot
#[derive(Parser)]
#[command(name = "authz-cli", version, about)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        default_value = config::CONFIG_DIR,
        help = "Directory holding default.toml and profile settings"
    )]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every derived fact about a user
    Summary {
        #[arg(long, help = "Path to the user JSON")]
        user: PathBuf,
    },
    /// Check module access, read and write
    #[command(name = "module")]
    ModuleAccess {
        #[arg(long)]
        user: PathBuf,
        #[arg(long)]
        module: Module,
    },
    /// Check permission strings (capability or module[:action])
    Check {
        #[arg(long)]
        user: PathBuf,
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,
        #[arg(long, action = ArgAction::SetTrue, help = "Require all permissions instead of any")]
        all: bool,
    },
    /// Check department access
    Department {
        #[arg(long)]
        user: PathBuf,
        #[arg(long)]
        department: String,
    },
    /// Check whether one user may manage another
    Manage {
        #[arg(long)]
        user: PathBuf,
        #[arg(long)]
        target: PathBuf,
    },
    /// List the configured roles
    Roles,
}

#[derive(Serialize)]
struct Decision<'a> {
    check: &'a str,
    subject: String,
    allowed: bool,
}

#[derive(Serialize)]
struct RoleRow<'a> {
    role_code: &'a str,
    level: u32,
    display_name: &'a str,
    modules: Vec<String>,
    capabilities: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (settings, resolver) =
        load_resolver(&cli.config_dir).context("failed to load configuration")?;
    config::init_tracing(settings.log_level(), settings.log_json);

    match cli.command {
        Commands::Summary { user } => {
            let user = read_user(&user)?;
            let summary = resolver.summarize(Some(&user));
            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} ({}, level {})",
                    summary.role_code, summary.role_display_name, summary.role_level
                );
                let modules: Vec<&str> =
                    summary.accessible_modules.iter().map(Module::as_str).collect();
                println!("modules: {}", modules.join(", "));
                println!("permissions: {}", summary.permissions.join(", "));
                println!(
                    "manager: {} • smart bi: read={} write={}",
                    summary.is_manager, summary.can_access_smart_bi, summary.can_write_smart_bi
                );
            }
        }
        Commands::ModuleAccess { user, module } => {
            let user = read_user(&user)?;
            let write = format_permission(module, Action::Write);
            render_decision(
                cli.json,
                &Decision {
                    check: "module_access",
                    subject: module.to_string(),
                    allowed: resolver.can_access_module(Some(&user), module),
                },
            )?;
            render_decision(
                cli.json,
                &Decision {
                    check: "module_write",
                    allowed: resolver.has_permission(Some(&user), &write),
                    subject: write,
                },
            )?;
        }
        Commands::Check {
            user,
            permissions,
            all,
        } => {
            let user = read_user(&user)?;
            let allowed = if all {
                resolver.has_all_permissions(Some(&user), permissions.as_slice())
            } else {
                resolver.has_any_permission(Some(&user), permissions.as_slice())
            };
            render_decision(
                cli.json,
                &Decision {
                    check: if all { "all_permissions" } else { "any_permission" },
                    subject: permissions.join(","),
                    allowed,
                },
            )?;
        }
        Commands::Department { user, department } => {
            let user = read_user(&user)?;
            render_decision(
                cli.json,
                &Decision {
                    check: "department",
                    allowed: resolver.can_access_department(Some(&user), &department),
                    subject: department,
                },
            )?;
        }
        Commands::Manage { user, target } => {
            let manager = read_user(&user)?;
            let subject = read_user(&target)?;
            render_decision(
                cli.json,
                &Decision {
                    check: "manage_user",
                    subject: subject.id.clone(),
                    allowed: resolver.can_manage_user(Some(&manager), Some(&subject)),
                },
            )?;
        }
        Commands::Roles => {
            let rows = role_rows(&resolver);
            if cli.json {
                print_json(&rows)?;
            } else {
                for row in rows {
                    println!(
                        "- {} • level {} • {}",
                        row.role_code, row.level, row.display_name
                    );
                }
            }
        }
    }

    Ok(())
}

fn read_user(path: &Path) -> Result<User> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read user file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid user JSON in {}", path.display()))
}

fn role_rows(resolver: &PermissionResolver) -> Vec<RoleRow<'_>> {
    let config = resolver.config();
    config
        .role_codes()
        .into_iter()
        .map(|code| {
            let meta = config.role_metadata(code);
            let modules = config
                .module_levels(code)
                .map(|levels| {
                    levels
                        .iter()
                        .filter(|(_, level)| level.is_granted())
                        .map(|(module, level)| format!("{}={}", module, level))
                        .collect()
                })
                .unwrap_or_default();
            let capabilities = config
                .capabilities(code)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            RoleRow {
                role_code: code,
                level: meta.level,
                display_name: &meta.display_name,
                modules,
                capabilities,
            }
        })
        .collect()
}

fn render_decision(json: bool, decision: &Decision<'_>) -> Result<()> {
    if json {
        return print_json(decision);
    }
    let verdict = if decision.allowed { "ALLOW" } else { "DENY" };
    // Normalize module references for display, e.g. `production` -> `production:read`
    let subject = ModulePermission::parse(&decision.subject)
        .map(|mp| mp.to_string())
        .unwrap_or_else(|| decision.subject.clone());
    println!("{} {} {}", verdict, decision.check, subject);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
