/*!
# Excel Service

A small HTTP service for reading, writing and inspecting `.xlsx` files, built in Rust.

## Overview

Each request opens the target workbook, does its work and drops it again; nothing is
cached between requests. Parsing and writing the file format is left to
`umya-spreadsheet`. The service adds request validation, row and column windows, the
write layout, chart placement and a header-structure heuristic, and wraps every answer
in the same JSON envelope.

## REST API Endpoints

- `GET /api/v1/health` - Static liveness payload
- `GET /api/v1/file-info?file_path=...` - Sheet sizes, header guess, merged cells
- `POST /api/v1/read` - Rows of a sheet, optionally windowed
- `POST /api/v1/write` - Header row plus one row per record
- `POST /api/v1/chart` - Column, line or pie chart over one range

Every response is `{success, data?, error?, message?}`. Bad requests answer 400,
failures inside the spreadsheet backend answer 500. `OPTIONS` on any path answers 204
and all responses carry permissive CORS headers.

## Modules

- **app**: Routing, handlers and middleware
- **chart**: Chart kinds and insertion
- **config**: Listener settings from the environment
- **coordinate**: A1 references and merged ranges
- **error**: Service errors and their HTTP mapping
- **header**: Multi-level header heuristic
- **info**: File and sheet structure report
- **locks**: Per-path write serialisation
- **response**: JSON envelope
- **table**: Read windows and write layout
- **workbook**: Access to the spreadsheet backend
*/

pub mod app;
pub mod chart;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod header;
pub mod info;
pub mod locks;
pub mod response;
pub mod table;
pub mod workbook;

pub use app::{router, run};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use header::{HeaderAssessment, StructureType, analyze_header};
