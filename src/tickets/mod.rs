//! Ticket dispatcher.
//!
//! Tickets are the command protocol external callers use against the
//! supervisor. A ticket arrives as a JSON object `{"name": ..., "params":
//! {...}}`, is validated against its kind's required-key set, and executes
//! against the [`Supervisor`]. Execution always yields a well-formed
//! envelope `{"status": bool, "body": {...}}`; errors raised during
//! execution are converted into `status=false` bodies at this boundary and
//! never propagate to the caller.
//!
//! The kind set is closed: dispatch is a match over [`Ticket`], not a
//! lookup by name into anything dynamic.

use crate::core::error::{HvError, HvResult};
use crate::supervisor::controller::{MULTIPLIER_MAX, MULTIPLIER_MIN};
use crate::supervisor::Supervisor;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// The closed set of ticket kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    /// Power the whole fleet down.
    Down,
    /// Set the whole fleet to a multiplier of each layer's default voltage.
    SetVoltage,
    /// Query channel parameters fleet-wide.
    GetParams,
}

impl TicketKind {
    /// Every kind, in wire-name order.
    pub const ALL: [TicketKind; 3] = [
        TicketKind::Down,
        TicketKind::SetVoltage,
        TicketKind::GetParams,
    ];

    /// Wire name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            TicketKind::Down => "Down",
            TicketKind::SetVoltage => "SetVoltage",
            TicketKind::GetParams => "GetParams",
        }
    }

    /// Look a kind up by wire name.
    pub fn from_name(name: &str) -> HvResult<Self> {
        match name {
            "Down" => Ok(TicketKind::Down),
            "SetVoltage" => Ok(TicketKind::SetVoltage),
            "GetParams" => Ok(TicketKind::GetParams),
            other => Err(HvError::UnknownTicket {
                name: other.to_string(),
            }),
        }
    }

    /// Parameter keys a request must carry to construct this kind.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            TicketKind::Down => &[],
            TicketKind::SetVoltage => &["target_voltage"],
            TicketKind::GetParams => &["select_params"],
        }
    }

    /// Structured, serializable schema of the kind: its wire name plus a
    /// per-parameter map carrying value bounds and a description.
    pub fn type_description(&self) -> TypeDescription {
        let mut params = BTreeMap::new();
        match self {
            TicketKind::Down => {}
            TicketKind::SetVoltage => {
                params.insert(
                    "target_voltage",
                    ParamSchema {
                        min_value: Some(MULTIPLIER_MIN),
                        max_value: Some(MULTIPLIER_MAX),
                        description: "Multiplier applied to each layer's default voltage.",
                    },
                );
            }
            TicketKind::GetParams => {
                params.insert(
                    "select_params",
                    ParamSchema {
                        min_value: None,
                        max_value: None,
                        description: "Parameter names to report, or null for all.",
                    },
                );
            }
        }
        TypeDescription {
            name: self.name(),
            params,
        }
    }

    /// Human-readable summary of what the kind does, for listings.
    pub fn summary(&self) -> &'static str {
        match self {
            TicketKind::Down => "power every channel down",
            TicketKind::SetVoltage => {
                "ramp every channel to target_voltage times its layer default"
            }
            TicketKind::GetParams => {
                "report channel parameters, optionally projected to select_params"
            }
        }
    }
}

/// Serializable schema of one ticket kind.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDescription {
    /// Wire name of the kind.
    pub name: &'static str,
    /// Schema of each parameter the kind understands.
    pub params: BTreeMap<&'static str, ParamSchema>,
}

/// Schema of one ticket parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSchema {
    /// Lowest accepted value, if the parameter is bounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Highest accepted value, if the parameter is bounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// What the parameter means.
    pub description: &'static str,
}

/// A validated, executable command.
#[derive(Debug, Clone, PartialEq)]
pub enum Ticket {
    /// Power the whole fleet down.
    Down,
    /// Ramp the fleet to a multiplier of each layer's default voltage.
    SetVoltage {
        /// Multiplier applied to each layer's default voltage, in [0, 1.2].
        target_voltage: f64,
    },
    /// Query parameters for every channel.
    GetParams {
        /// Names to project each channel's result to; `None` reports the
        /// full known set plus the synthetic `VDef`.
        select_params: Option<BTreeSet<String>>,
    },
}

impl Ticket {
    /// The kind of this ticket.
    pub fn kind(&self) -> TicketKind {
        match self {
            Ticket::Down => TicketKind::Down,
            Ticket::SetVoltage { .. } => TicketKind::SetVoltage,
            Ticket::GetParams { .. } => TicketKind::GetParams,
        }
    }

    /// Check that a raw request object could construct a ticket of `kind`:
    /// it has `name` and `params` keys, `params` is an object, and the
    /// object's keys cover the kind's required-key set.
    pub fn inspect(raw: &Value, kind: TicketKind) -> HvResult<bool> {
        let object = raw.as_object().ok_or_else(|| {
            HvError::MalformedTicket {
                message: "ticket must be a JSON object".to_string(),
            }
        })?;
        if !object.contains_key("name") {
            return Err(HvError::MissingField {
                field: "name".to_string(),
            });
        }
        let params = object.get("params").ok_or_else(|| HvError::MissingField {
            field: "params".to_string(),
        })?;
        let params = params.as_object().ok_or_else(|| HvError::MalformedTicket {
            message: "params must be a JSON object".to_string(),
        })?;
        Ok(kind
            .required_keys()
            .iter()
            .all(|key| params.contains_key(*key)))
    }

    /// Construct a ticket from a raw request object.
    pub fn deserialize(raw: &Value) -> HvResult<Self> {
        let object = raw.as_object().ok_or_else(|| HvError::MalformedTicket {
            message: "ticket must be a JSON object".to_string(),
        })?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| HvError::MissingField {
                field: "name".to_string(),
            })?;
        let kind = TicketKind::from_name(name)?;
        let params = object
            .get("params")
            .ok_or_else(|| HvError::MissingField {
                field: "params".to_string(),
            })?
            .as_object()
            .ok_or_else(|| HvError::MalformedTicket {
                message: "params must be a JSON object".to_string(),
            })?;

        match kind {
            TicketKind::Down => Ok(Ticket::Down),
            TicketKind::SetVoltage => {
                let target_voltage = params
                    .get("target_voltage")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| HvError::MissingField {
                        field: "target_voltage".to_string(),
                    })?;
                Ok(Ticket::SetVoltage { target_voltage })
            }
            TicketKind::GetParams => {
                let select_params = match params.get("select_params") {
                    None | Some(Value::Null) => None,
                    Some(value) => {
                        let names = value.as_array().ok_or_else(|| {
                            HvError::MalformedTicket {
                                message: "select_params must be an array of names".to_string(),
                            }
                        })?;
                        let mut set = BTreeSet::new();
                        for name in names {
                            let name =
                                name.as_str().ok_or_else(|| HvError::MalformedTicket {
                                    message: "select_params entries must be strings".to_string(),
                                })?;
                            set.insert(name.to_string());
                        }
                        Some(set)
                    }
                };
                Ok(Ticket::GetParams { select_params })
            }
        }
    }

    /// Parse a ticket from a raw request string.
    pub fn from_json_str(raw: &str) -> HvResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| HvError::MalformedTicket {
                message: err.to_string(),
            })?;
        Self::deserialize(&value)
    }

    /// The ticket's wire form: `{"name": <kind>, "params": {...}}`.
    pub fn description(&self) -> Value {
        let params = match self {
            Ticket::Down => Map::new(),
            Ticket::SetVoltage { target_voltage } => {
                let mut map = Map::new();
                map.insert("target_voltage".to_string(), json!(target_voltage));
                map
            }
            // The selection is a query-time filter, not part of the
            // ticket's identity on the wire.
            Ticket::GetParams { .. } => Map::new(),
        };
        json!({ "name": self.kind().name(), "params": Value::Object(params) })
    }

    /// Serialize the ticket to its wire string.
    pub fn serialize(&self) -> String {
        self.description().to_string()
    }

    /// Execute the ticket against a supervisor.
    ///
    /// Always returns `{"status": bool, "body": {...}}`. Any error raised
    /// during execution is caught here and reported as a `status=false`
    /// body; it never propagates.
    pub fn execute(&self, supervisor: &Supervisor) -> Value {
        info!(ticket = self.kind().name(), "executing ticket");
        let result = self.run(supervisor);
        match result {
            Ok(body) => json!({ "status": true, "body": body }),
            Err(err) => {
                warn!(ticket = self.kind().name(), error = %err, "ticket failed");
                json!({ "status": false, "body": { "error": err.to_string() } })
            }
        }
    }

    fn run(&self, supervisor: &Supervisor) -> HvResult<Value> {
        match self {
            Ticket::Down => {
                supervisor.power_down(None)?;
                Ok(json!({}))
            }
            Ticket::SetVoltage { target_voltage } => {
                supervisor.set_voltage(None, *target_voltage)?;
                Ok(json!({}))
            }
            Ticket::GetParams { select_params } => {
                let reports = supervisor.get_params(None, select_params.as_ref())?;
                Ok(json!({ "params": reports }))
            }
        }
    }
}
