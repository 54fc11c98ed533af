// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response classification: from a decoded CoAP frame to a typed
//! LwM2M operation descriptor.

use mote_core::{
    BootstrapAttrs, DiscoverAttrs, NotificationAttrs, Path, RegisterAttrs,
};
use thiserror::Error;

use crate::block::Block;
use crate::code::Code;
use crate::error::CoapError;
use crate::msg::{Message, MsgType, Token};

/// Cap on captured Location-Path segments from a Register response.
pub const MAX_LOCATION_SEGMENTS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("frame is not a request")]
    NotARequest,

    #[error("frame is not a response")]
    NotAResponse,

    #[error("method {0} not allowed on this path")]
    MethodNotAllowed(Code),

    #[error("data model path is invalid")]
    BadPath,

    #[error("bad uri query '{0}'")]
    BadQuery(String),

    #[error("register response carries too many location segments")]
    TooManyLocationSegments,

    #[error(transparent)]
    Coap(#[from] CoapError),
}

/// A classified LwM2M operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    BootstrapRequest(BootstrapAttrs),
    BootstrapFinish,
    BootstrapPack,
    Register(RegisterAttrs),
    Update { location: Vec<String>, attrs: RegisterAttrs },
    Deregister { location: Vec<String> },
    Send,
    Read { path: Path },
    ReadComposite,
    Discover { path: Path, attrs: DiscoverAttrs },
    ObserveStart { path: Path, attrs: NotificationAttrs },
    ObserveCancel { path: Path },
    WriteReplace { path: Path },
    WritePartialUpdate { path: Path },
    WriteComposite,
    WriteAttributes { path: Path, attrs: NotificationAttrs },
    Execute { path: Path },
    Create { path: Path },
    Delete { path: Path },
}

impl Operation {
    /// The data model path this operation addresses, if any.
    pub fn path(&self) -> Option<Path> {
        match self {
            Operation::Read { path }
            | Operation::Discover { path, .. }
            | Operation::ObserveStart { path, .. }
            | Operation::ObserveCancel { path }
            | Operation::WriteReplace { path }
            | Operation::WritePartialUpdate { path }
            | Operation::WriteAttributes { path, .. }
            | Operation::Execute { path }
            | Operation::Create { path }
            | Operation::Delete { path } => Some(*path),
            _ => None,
        }
    }

    /// True for operations that mutate the data model.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::WriteReplace { .. }
                | Operation::WritePartialUpdate { .. }
                | Operation::WriteComposite
                | Operation::Create { .. }
                | Operation::Delete { .. }
        )
    }
}

/// A classified inbound request with its frame-level trimmings.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: Operation,
    pub kind: MsgType,
    pub message_id: u16,
    pub token: Token,
    /// Raw Content-Format number; unknown numbers surface as 4.15 later.
    pub content_format: Option<u16>,
    pub accept: Option<u16>,
    pub observe: Option<u32>,
    pub block1: Option<Block>,
    pub block2: Option<Block>,
    pub payload: Vec<u8>,
}

/// A classified inbound response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub kind: MsgType,
    pub code: Code,
    pub message_id: u16,
    pub token: Token,
    pub location: Vec<String>,
    pub etag: Option<Vec<u8>>,
    pub observe: Option<u32>,
    pub block1: Option<Block>,
    pub block2: Option<Block>,
    pub content_format: Option<u16>,
    pub payload: Vec<u8>,
}

pub fn classify_request(msg: Message) -> Result<Request, ClassifyError> {
    if !msg.code.is_request() {
        return Err(ClassifyError::NotARequest);
    }

    let segments = msg.uri_path()?;
    let queries = msg.uri_queries()?;
    let observe = msg.observe()?;
    let accept = msg.accept_raw()?;
    let content_format = msg.content_format_raw()?;

    let operation = match segments.first().copied() {
        Some("bs") => classify_bootstrap(msg.code, &queries)?,
        Some("bspack") if msg.code == Code::GET => Operation::BootstrapPack,
        Some("rd") => classify_registration(msg.code, &segments, &queries)?,
        Some("dp") if msg.code == Code::POST => Operation::Send,
        _ => {
            let path = numeric_path(&segments)?;
            classify_data_model(msg.code, path, &queries, observe, accept, content_format)?
        }
    };

    Ok(Request {
        operation,
        kind: msg.kind,
        message_id: msg.message_id,
        token: msg.token,
        content_format,
        accept,
        observe,
        block1: msg.block1()?,
        block2: msg.block2()?,
        payload: msg.payload,
    })
}

pub fn classify_response(msg: Message) -> Result<Response, ClassifyError> {
    let is_bare_signal =
        msg.code.is_empty() && matches!(msg.kind, MsgType::Acknowledgement | MsgType::Reset);
    if !msg.code.is_response() && !is_bare_signal {
        return Err(ClassifyError::NotAResponse);
    }

    let location: Vec<String> = msg
        .location_path()?
        .into_iter()
        .map(str::to_string)
        .collect();
    if location.len() > MAX_LOCATION_SEGMENTS {
        return Err(ClassifyError::TooManyLocationSegments);
    }

    Ok(Response {
        kind: msg.kind,
        code: msg.code,
        message_id: msg.message_id,
        token: msg.token,
        location,
        etag: msg.etag()?.map(<[u8]>::to_vec),
        observe: msg.observe()?,
        block1: msg.block1()?,
        block2: msg.block2()?,
        content_format: msg.content_format_raw()?,
        payload: msg.payload,
    })
}

fn classify_bootstrap(code: Code, queries: &[&str]) -> Result<Operation, ClassifyError> {
    if code != Code::POST {
        return Err(ClassifyError::MethodNotAllowed(code));
    }
    let attrs = parse_bootstrap_attrs(queries)?;
    if attrs.endpoint.is_some() {
        Ok(Operation::BootstrapRequest(attrs))
    } else {
        Ok(Operation::BootstrapFinish)
    }
}

fn classify_registration(
    code: Code,
    segments: &[&str],
    queries: &[&str],
) -> Result<Operation, ClassifyError> {
    let location: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
    match code {
        Code::POST if segments.len() == 1 => Ok(Operation::Register(parse_register_attrs(queries)?)),
        Code::POST => Ok(Operation::Update { location, attrs: parse_register_attrs(queries)? }),
        Code::DELETE => Ok(Operation::Deregister { location }),
        other => Err(ClassifyError::MethodNotAllowed(other)),
    }
}

fn classify_data_model(
    code: Code,
    path: Path,
    queries: &[&str],
    observe: Option<u32>,
    accept: Option<u16>,
    content_format: Option<u16>,
) -> Result<Operation, ClassifyError> {
    match code {
        Code::GET => Ok(match observe {
            Some(0) => Operation::ObserveStart {
                path,
                attrs: parse_notification_attrs(queries, false)?,
            },
            Some(_) => Operation::ObserveCancel { path },
            None if accept == Some(mote_core::ContentFormat::LinkFormat.number()) => {
                Operation::Discover { path, attrs: parse_discover_attrs(queries)? }
            }
            None => Operation::Read { path },
        }),
        Code::FETCH => Ok(Operation::ReadComposite),
        Code::IPATCH | Code::PATCH => Ok(Operation::WriteComposite),
        Code::PUT => {
            if content_format.is_none() {
                Ok(Operation::WriteAttributes {
                    path,
                    attrs: parse_notification_attrs(queries, true)?,
                })
            } else {
                Ok(Operation::WriteReplace { path })
            }
        }
        Code::POST => {
            if path.is_object() {
                Ok(Operation::Create { path })
            } else if path.is_instance() && content_format.is_some() {
                Ok(Operation::WritePartialUpdate { path })
            } else if path.is_resource() {
                Ok(Operation::Execute { path })
            } else {
                Err(ClassifyError::MethodNotAllowed(code))
            }
        }
        Code::DELETE => Ok(Operation::Delete { path }),
        other => Err(ClassifyError::MethodNotAllowed(other)),
    }
}

fn numeric_path(segments: &[&str]) -> Result<Path, ClassifyError> {
    let mut ids = Vec::with_capacity(segments.len());
    for segment in segments {
        let id: u16 = segment.parse().map_err(|_| ClassifyError::BadPath)?;
        ids.push(id);
    }
    Path::from_ids(&ids).map_err(|_| ClassifyError::BadPath)
}

fn parse_notification_attrs(
    queries: &[&str],
    strict: bool,
) -> Result<NotificationAttrs, ClassifyError> {
    let mut attrs = NotificationAttrs::default();
    for query in queries {
        let bad = || ClassifyError::BadQuery(query.to_string());
        let Some((key, value)) = query.split_once('=') else {
            if strict {
                return Err(bad());
            }
            continue;
        };
        match key {
            "pmin" => attrs.pmin = Some(value.parse().map_err(|_| bad())?),
            "pmax" => attrs.pmax = Some(value.parse().map_err(|_| bad())?),
            "epmin" => attrs.epmin = Some(value.parse().map_err(|_| bad())?),
            "epmax" => attrs.epmax = Some(value.parse().map_err(|_| bad())?),
            "gt" => attrs.gt = Some(value.parse().map_err(|_| bad())?),
            "lt" => attrs.lt = Some(value.parse().map_err(|_| bad())?),
            "st" => attrs.st = Some(value.parse().map_err(|_| bad())?),
            "con" => attrs.con = Some(parse_bool(value).ok_or_else(bad)?),
            "edge" => attrs.edge = Some(parse_bool(value).ok_or_else(bad)?),
            "hqmax" => attrs.hqmax = Some(value.parse().map_err(|_| bad())?),
            _ if strict => return Err(bad()),
            _ => {}
        }
    }
    Ok(attrs)
}

fn parse_register_attrs(queries: &[&str]) -> Result<RegisterAttrs, ClassifyError> {
    let mut attrs = RegisterAttrs::default();
    for query in queries {
        let bad = || ClassifyError::BadQuery(query.to_string());
        match query.split_once('=') {
            None if *query == "Q" => attrs.queue_mode = true,
            None => return Err(bad()),
            Some(("ep", value)) => attrs.endpoint = Some(value.to_string()),
            Some(("lt", value)) => attrs.lifetime = Some(value.parse().map_err(|_| bad())?),
            Some(("lwm2m", value)) => attrs.lwm2m = Some(value.to_string()),
            Some(("b", value)) => attrs.binding = Some(value.to_string()),
            Some(("sms", value)) => attrs.sms = Some(value.to_string()),
            Some(_) => return Err(bad()),
        }
    }
    Ok(attrs)
}

fn parse_bootstrap_attrs(queries: &[&str]) -> Result<BootstrapAttrs, ClassifyError> {
    let mut attrs = BootstrapAttrs::default();
    for query in queries {
        let bad = || ClassifyError::BadQuery(query.to_string());
        match query.split_once('=') {
            Some(("ep", value)) => attrs.endpoint = Some(value.to_string()),
            Some(("pct", value)) => {
                attrs.preferred_format = Some(value.parse().map_err(|_| bad())?)
            }
            _ => return Err(bad()),
        }
    }
    Ok(attrs)
}

fn parse_discover_attrs(queries: &[&str]) -> Result<DiscoverAttrs, ClassifyError> {
    let mut attrs = DiscoverAttrs::default();
    for query in queries {
        let bad = || ClassifyError::BadQuery(query.to_string());
        match query.split_once('=') {
            Some(("depth", value)) => {
                let depth: u8 = value.parse().map_err(|_| bad())?;
                if depth > 3 {
                    return Err(bad());
                }
                attrs.depth = Some(depth);
            }
            _ => return Err(bad()),
        }
    }
    Ok(attrs)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
