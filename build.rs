// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("bal-update")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Ballerina Update Tool Contributors")
        .about("Manage Ballerina distributions: fetch, activate, update, and remove releases")
        .subcommand_required(false)
        .subcommand(
            Command::new("pull")
                .about("Fetch a given distribution and set it as the active version")
                .arg(
                    Arg::new("version")
                        .required(true)
                        .help("Distribution version, or 'latest'"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Update the active distribution to the latest patch of its series"),
        )
        .subcommand(
            Command::new("use")
                .about("Mark an installed distribution as the active distribution")
                .arg(
                    Arg::new("version")
                        .required(true)
                        .help("Distribution version to activate"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a non-active distribution, or all of them")
                .arg(Arg::new("version").help("Distribution version to remove"))
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .action(clap::ArgAction::SetTrue)
                        .help("Remove all non-active distributions"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List distributions available locally and remotely")
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .action(clap::ArgAction::SetTrue)
                        .help("Show every release instead of the most recent ones"),
                )
                .arg(
                    Arg::new("pre_releases")
                        .short('p')
                        .long("pre-releases")
                        .action(clap::ArgAction::SetTrue)
                        .help("Include pre-release channels"),
                ),
        )
        .subcommand(
            Command::new("self-update")
                .about("Update the update tool itself to its latest version"),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("bal-update.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
