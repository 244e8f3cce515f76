//! CLI entry point: loads a class file, optionally dumps its contents, and
//! optionally executes its `main([Ljava/lang/String;)V`.
use clap::Parser;
use coldjvm::classfile::read_class_file;
use coldjvm::vm::Vm;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "coldjvm", about = "A minimal JVM bytecode interpreter")]
struct Args {
    /// Path to the `.class` file, with or without the `.class` suffix.
    class_file: PathBuf,

    /// Print a human-readable dump of the parsed class file.
    #[arg(short = 'c', long = "show-contents")]
    show_contents: bool,

    /// Execute `main([Ljava/lang/String;)V` on the class.
    #[arg(short = 'e', long = "execute")]
    execute: bool,

    /// Emit a UTF-8 BOM on stdout before any other output.
    #[arg(short = 'b', long = "bom")]
    bom: bool,

    /// Directory classes are resolved against. Defaults to the working directory.
    #[arg(long = "class-path", default_value = ".")]
    class_path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.bom {
        let stdout = std::io::stdout();
        let _ = stdout.lock().write_all(&[0xEF, 0xBB, 0xBF]);
    }

    let stem = args.class_file.with_extension("");
    let entry_name = stem.to_string_lossy().into_owned().into_bytes();

    let file_path = args.class_file.with_extension("class");
    let bytes = match read_class_file(&file_path) {
        Ok(b) => b,
        Err(e) => {
            log::error!("{e}");
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let class_file = match coldjvm::classfile::ClassFileParser::parse(&bytes) {
        Ok(cf) => cf,
        Err(e) => {
            log::error!("{e}");
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if args.show_contents {
        println!("{class_file:#?}");
    }

    if args.execute {
        let mut vm = Vm::new(args.class_path);
        if let Err(e) = vm.execute_main(&entry_name) {
            log::error!("{e}");
            println!("{e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
