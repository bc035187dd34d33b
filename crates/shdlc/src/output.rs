use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use shdlc_frame::status::{status_name, NO_ERROR};
use shdlc_frame::{Request, Response};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    address: u8,
    command: u8,
    data_len: usize,
    wire_len: usize,
    wire: &'a str,
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    status: &'a str,
    address: u8,
    command: u8,
    state: u8,
    error_code: u8,
    data_len: u8,
    payload: &'a str,
}

#[derive(Serialize)]
struct RequestOutput<'a> {
    address: u8,
    command: u8,
    data_len: usize,
    data: &'a str,
}

pub fn print_encoded(request: &Request, wire: &[u8], format: OutputFormat) {
    let wire_hex = to_hex(wire);
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            address: request.address,
            command: request.command,
            data_len: request.data.len(),
            wire_len: wire.len(),
            wire: &wire_hex,
        }),
        OutputFormat::Table => print_table(
            vec!["ADDRESS", "COMMAND", "DATA LEN", "WIRE"],
            vec![
                format!("0x{:02X}", request.address),
                format!("0x{:02X}", request.command),
                request.data.len().to_string(),
                wire_hex,
            ],
        ),
        OutputFormat::Pretty => println!("{}", to_spaced_hex(wire)),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_request(request: &Request, format: OutputFormat) {
    let data_hex = to_hex(&request.data);
    match format {
        OutputFormat::Json => print_json(&RequestOutput {
            address: request.address,
            command: request.command,
            data_len: request.data.len(),
            data: &data_hex,
        }),
        OutputFormat::Table => print_table(
            vec!["ADDRESS", "COMMAND", "DATA LEN", "DATA"],
            vec![
                format!("0x{:02X}", request.address),
                format!("0x{:02X}", request.command),
                request.data.len().to_string(),
                data_hex,
            ],
        ),
        OutputFormat::Pretty => println!(
            "addr=0x{:02X} cmd=0x{:02X} len={} data={}",
            request.address,
            request.command,
            request.data.len(),
            to_spaced_hex(&request.data)
        ),
        OutputFormat::Raw => print_raw(&request.data),
    }
}

pub fn print_response(response: &Response, format: OutputFormat) {
    let header = response.header;
    let payload_hex = to_hex(&response.payload);
    match format {
        OutputFormat::Json => print_json(&ResponseOutput {
            status: status_name(NO_ERROR),
            address: header.address,
            command: header.command,
            state: header.state,
            error_code: header.error_code(),
            data_len: header.data_len,
            payload: &payload_hex,
        }),
        OutputFormat::Table => print_table(
            vec!["ADDRESS", "COMMAND", "STATE", "DATA LEN", "PAYLOAD"],
            vec![
                format!("0x{:02X}", header.address),
                format!("0x{:02X}", header.command),
                format!("0x{:02X}", header.state),
                header.data_len.to_string(),
                payload_hex,
            ],
        ),
        OutputFormat::Pretty => println!(
            "addr=0x{:02X} cmd=0x{:02X} state=0x{:02X} len={} data={}",
            header.address,
            header.command,
            header.state,
            header.data_len,
            to_spaced_hex(&response.payload)
        ),
        OutputFormat::Raw => print_raw(&response.payload),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

fn to_spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
