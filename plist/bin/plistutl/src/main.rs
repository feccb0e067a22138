mod tracing;

use std::error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use plist_codec::{Format, Value};

use crate::tracing::TracingConfig;

#[derive(Debug, Parser)]
struct Plistutl {
    #[command(flatten)]
    tracing: TracingConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Converts a property list between the XML and binary formats.
    Convert {
        #[arg(long, value_enum)]
        to: FormatArg,
        #[arg(long, value_enum, help = "Input format (detected when omitted)")]
        from: Option<FormatArg>,
        #[command(flatten)]
        io: IoArgs,
    },
    /// Converts a property list to JSON, or JSON to an XML property list.
    Json {
        #[arg(short, long)]
        reverse: bool,
        #[command(flatten)]
        io: IoArgs,
    },
    /// Prints the decoded value tree.
    Debug {
        #[command(flatten)]
        io: IoArgs,
    },
}

#[derive(Args, Debug)]
struct IoArgs {
    #[arg(help = "Input path (default: stdin)")]
    input: Option<PathBuf>,
    #[arg(short, long, help = "Output path (default: stdout)")]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Xml,
    Binary,
}

impl From<FormatArg> for Format {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Xml => Self::Xml,
            FormatArg::Binary => Self::Binary,
        }
    }
}

type Reader = Box<dyn FnOnce() -> Result<Value, Error>>;
type Writer = Box<dyn FnOnce(Value) -> Result<(), Error>>;

type Error = Box<dyn error::Error>;

impl Plistutl {
    fn execute(&self) -> Result<(), Error> {
        let (reader, writer) = match &self.command {
            Command::Convert { to, from, io } => (
                plist_reader(io.open_input()?, from.map(Format::from)),
                plist_writer(io.open_output()?, Format::from(*to)),
            ),
            Command::Json { reverse: false, io } => {
                (plist_reader(io.open_input()?, None), json_writer(io.open_output()?))
            }
            Command::Json { reverse: true, io } => (
                json_reader(io.open_input()?),
                plist_writer(io.open_output()?, Format::Xml),
            ),
            Command::Debug { io } => {
                (plist_reader(io.open_input()?, None), debug_writer(io.open_output()?))
            }
        };
        writer(reader()?)
    }
}

impl IoArgs {
    fn open_input(&self) -> Result<Box<dyn Read>, Error> {
        Ok(match &self.input {
            Some(path) => Box::new(File::open(path)?),
            None => Box::new(io::stdin()),
        })
    }

    fn open_output(&self) -> Result<Box<dyn Write>, Error> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(io::stdout()),
        })
    }
}

fn plist_reader(mut reader: Box<dyn Read>, format: Option<Format>) -> Reader {
    Box::new(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let format = format.unwrap_or_else(|| Format::detect(&buf));
        ::tracing::debug!(?format, size = buf.len(), "read plist");
        Ok(plist_codec::from_slice(&buf, format)?)
    })
}

fn json_reader(reader: Box<dyn Read>) -> Reader {
    Box::new(move || Ok(serde_json::from_reader(reader)?))
}

fn plist_writer(mut writer: Box<dyn Write>, format: Format) -> Writer {
    Box::new(move |value| {
        plist_codec::to_writer(&mut writer, &value, format)?;
        writer.flush()?;
        Ok(())
    })
}

fn json_writer(mut writer: Box<dyn Write>) -> Writer {
    Box::new(move |value| {
        serde_json::to_writer_pretty(&mut writer, &value)?;
        std::writeln!(writer)?;
        writer.flush()?;
        Ok(())
    })
}

fn debug_writer(mut writer: Box<dyn Write>) -> Writer {
    Box::new(move |value| {
        std::writeln!(writer, "{value:#?}")?;
        writer.flush()?;
        Ok(())
    })
}

fn main() -> Result<(), Error> {
    let plistutl = Plistutl::parse();
    plistutl.tracing.init();
    plistutl.execute()
}
