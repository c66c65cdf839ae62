// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("kiln")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Kiln Contributors")
        .about("Resolve build plugins and run the tasks they provide")
        .subcommand_required(true)
        .arg(
            Arg::new("project_dir")
                .short('C')
                .long("project-dir")
                .value_name("DIR")
                .global(true)
                .help("Project directory (default: current directory)"),
        )
        .arg(
            Arg::new("home")
                .long("home")
                .value_name("DIR")
                .global(true)
                .help("Kiln home directory (default: $KILN_HOME or ~/.kiln)"),
        )
        .arg(
            Arg::new("no_cache")
                .long("no-cache")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Neither read nor write the plugin cache"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Pass the debug flag to plugins that accept one"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v for info, -vv for debug)"),
        )
        .subcommand(Command::new("tasks").about("List the tasks provided by the project's plugins"))
        .subcommand(
            Command::new("run")
                .about("Run a plugin task")
                .arg(Arg::new("task").required(true).help("Task name"))
                .arg(
                    Arg::new("args")
                        .num_args(0..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .help("Arguments passed to the task"),
                ),
        )
        .subcommand(
            Command::new("verify-plugins")
                .about("Resolve the project's plugins and check that they are compatible"),
        )
        .subcommand(
            Command::new("upgrade-config")
                .about("Upgrade plugin configuration files to their current format"),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell to generate completions for"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("kiln.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
