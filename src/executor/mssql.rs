//! SQL Server adapter with typed parameters.
//!
//! # Responsibilities
//! - Rewrite placeholders to named `@vN` parameters
//! - Turn `{TYPE(ARGS)}` annotations into concrete parameter types
//! - Hand named inputs to the injected TDS client
//!
//! # Design Decisions
//! - The driver is a trait object supplied by the caller, not a global
//! - Type constructors live in a `TypeRegistry` passed to the constructor
//! - An annotation without arguments builds the type with its defaults

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::executor::{placeholders, ExecError, Executor};
use crate::template::QueryDescriptor;
use crate::BoxError;

/// Declared length of a character or binary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Max,
    Fixed(u32),
}

/// A SQL Server parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Real,
    Decimal { precision: u8, scale: u8 },
    Numeric { precision: u8, scale: u8 },
    Money,
    Char(Length),
    NChar(Length),
    VarChar(Length),
    NVarChar(Length),
    Text,
    NText,
    Binary(Length),
    VarBinary(Length),
    Date,
    DateTime,
    DateTime2 { scale: u8 },
    DateTimeOffset { scale: u8 },
    Time { scale: u8 },
    UniqueIdentifier,
    Xml,
}

/// A value with an explicit type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedParam {
    pub ty: SqlType,
    pub value: Value,
}

/// One named input of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Driver infers the type.
    Raw(Value),
    Typed(TypedParam),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedInput {
    /// Parameter name without `@`, e.g. `v1`.
    pub name: String,
    pub input: Input,
}

/// The SQL Server driver as seen by the adapter.
#[async_trait]
pub trait TdsClient: Send + Sync {
    async fn query(&self, sql: &str, inputs: Vec<NamedInput>) -> Result<Value, BoxError>;
}

/// Builds a type from annotation arguments.
pub type TypeConstructor = fn(&[u32]) -> Result<SqlType, String>;

/// Type name → constructor.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: HashMap<String, TypeConstructor>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the SQL Server types under their driver names.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register("Bit", |args| fixed(args, SqlType::Bit))
            .register("TinyInt", |args| fixed(args, SqlType::TinyInt))
            .register("SmallInt", |args| fixed(args, SqlType::SmallInt))
            .register("Int", |args| fixed(args, SqlType::Int))
            .register("BigInt", |args| fixed(args, SqlType::BigInt))
            .register("Float", |args| fixed(args, SqlType::Float))
            .register("Real", |args| fixed(args, SqlType::Real))
            .register("Money", |args| fixed(args, SqlType::Money))
            .register("Decimal", |args| {
                let (precision, scale) = precision_scale(args)?;
                Ok(SqlType::Decimal { precision, scale })
            })
            .register("Numeric", |args| {
                let (precision, scale) = precision_scale(args)?;
                Ok(SqlType::Numeric { precision, scale })
            })
            .register("Char", |args| length(args).map(SqlType::Char))
            .register("NChar", |args| length(args).map(SqlType::NChar))
            .register("VarChar", |args| length(args).map(SqlType::VarChar))
            .register("NVarChar", |args| length(args).map(SqlType::NVarChar))
            .register("Text", |args| fixed(args, SqlType::Text))
            .register("NText", |args| fixed(args, SqlType::NText))
            .register("Binary", |args| length(args).map(SqlType::Binary))
            .register("VarBinary", |args| length(args).map(SqlType::VarBinary))
            .register("Date", |args| fixed(args, SqlType::Date))
            .register("DateTime", |args| fixed(args, SqlType::DateTime))
            .register("DateTime2", |args| {
                scale(args).map(|scale| SqlType::DateTime2 { scale })
            })
            .register("DateTimeOffset", |args| {
                scale(args).map(|scale| SqlType::DateTimeOffset { scale })
            })
            .register("Time", |args| scale(args).map(|scale| SqlType::Time { scale }))
            .register("UniqueIdentifier", |args| fixed(args, SqlType::UniqueIdentifier))
            .register("Xml", |args| fixed(args, SqlType::Xml));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, constructor: TypeConstructor) -> &mut Self {
        self.constructors.insert(name.into(), constructor);
        self
    }

    /// Build the type `name` with `args`.
    pub fn construct(&self, name: &str, args: &[u32]) -> Result<SqlType, ExecError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ExecError::UnknownType(name.to_string()))?;
        constructor(args).map_err(|reason| ExecError::TypeArguments {
            ty: name.to_string(),
            args: args.to_vec(),
            reason,
        })
    }
}

fn fixed(args: &[u32], ty: SqlType) -> Result<SqlType, String> {
    if args.is_empty() {
        Ok(ty)
    } else {
        Err("takes no arguments".to_string())
    }
}

fn length(args: &[u32]) -> Result<Length, String> {
    match args {
        [] => Ok(Length::Max),
        [0] => Err("length must be positive".to_string()),
        [n] => Ok(Length::Fixed(*n)),
        _ => Err("takes at most one argument".to_string()),
    }
}

fn small(arg: u32, max: u8, what: &str) -> Result<u8, String> {
    u8::try_from(arg)
        .ok()
        .filter(|value| *value <= max)
        .ok_or_else(|| format!("{} must be at most {}", what, max))
}

fn precision_scale(args: &[u32]) -> Result<(u8, u8), String> {
    let (precision, scale) = match args {
        [] => (18, 0),
        [p] => (small(*p, 38, "precision")?, 0),
        [p, s] => (small(*p, 38, "precision")?, small(*s, 38, "scale")?),
        _ => return Err("takes at most two arguments".to_string()),
    };
    if precision == 0 || scale > precision {
        return Err("scale must not exceed a positive precision".to_string());
    }
    Ok((precision, scale))
}

fn scale(args: &[u32]) -> Result<u8, String> {
    match args {
        [] => Ok(7),
        [s] => small(*s, 7, "scale"),
        _ => Err("takes at most one argument".to_string()),
    }
}

/// Executes templates through a [`TdsClient`] with `@vN` parameters.
pub struct MssqlExecutor<C> {
    client: C,
    types: TypeRegistry,
}

impl<C: TdsClient> MssqlExecutor<C> {
    pub fn new(client: C, types: TypeRegistry) -> Self {
        Self { client, types }
    }

    /// Named inputs for `query`, typed where annotated.
    pub fn inputs(&self, values: Vec<Value>, metadata: Vec<crate::template::ParamMeta>) -> Result<Vec<NamedInput>, ExecError> {
        values
            .into_iter()
            .zip(metadata)
            .enumerate()
            .map(|(i, (value, meta))| {
                let input = match meta.ty {
                    Some(ty) => {
                        let args = meta.type_args.unwrap_or_default();
                        Input::Typed(TypedParam {
                            ty: self.types.construct(&ty, &args)?,
                            value,
                        })
                    }
                    None => Input::Raw(value),
                };
                Ok(NamedInput {
                    name: format!("v{}", i + 1),
                    input,
                })
            })
            .collect()
    }
}

#[async_trait]
impl<C: TdsClient> Executor for MssqlExecutor<C> {
    async fn execute(&self, query: QueryDescriptor) -> Result<Value, ExecError> {
        let sql = placeholders::numbered(&query.text, "@v");
        let inputs = self.inputs(query.values, query.metadata)?;
        self.client
            .query(&sql, inputs)
            .await
            .map_err(ExecError::Driver)
    }

    fn backend(&self) -> &'static str {
        "mssql"
    }
}
