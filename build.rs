// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("renew")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Self-update engine utilities")
        .subcommand_required(true)
        .subcommand(
            Command::new("sergen")
                .about("Generate the JSON manifest for an HTTP update server")
                .arg(
                    Arg::new("url")
                        .short('u')
                        .long("url")
                        .required(true)
                        .help("Base URL under which the version folders are served"),
                )
                .arg(
                    Arg::new("input_dir")
                        .short('i')
                        .long("input-dir")
                        .required(true)
                        .help("Path to the versions directory (one sub-directory per version)"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("serv_update.json")
                        .help("Where to write the generated manifest"),
                )
                .arg(
                    Arg::new("desc_filename")
                        .short('d')
                        .long("desc-filename")
                        .default_value("description.txt")
                        .help("Filename of the per-version description file"),
                )
                .arg(
                    Arg::new("separator")
                        .short('s')
                        .long("separator")
                        .default_value("=====")
                        .help("Separator between release name and description"),
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

    if let Err(e) = fs::write(man_dir.join("renew.1"), buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
