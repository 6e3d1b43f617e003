#![allow(dead_code)]
//! In-memory store answering requests the way a remote instance would.
//!
//! Request bodies are produced by the library's own encoders and decoded here
//! with `rmpv`; responses are encoded as `{DATA: [...]}` bodies and handed to
//! the request's own response decoder.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use rmpv::Value;
use serde::{Deserialize, Serialize};
use tarantool_space::network::client::{AsClient, ClientError, ServerError};
use tarantool_space::network::protocol::codec::{self, iproto_key::*};
use tarantool_space::network::protocol::{IProtoType, Request};
use tarantool_space::space::{SpaceId, SystemSpace};
use tarantool_space::tuple::{Encode, Tuple};

pub const USERS: SpaceId = 512;
pub const COUNTERS: SpaceId = 513;

const ER_NO_SUCH_INDEX_ID: u32 = 35;
const ER_TUPLE_FOUND: u32 = 3;
const ER_NO_SUCH_PROC: u32 = 33;
const ER_UNSUPPORTED: u32 = 5;
const ER_NO_SUCH_FIELD_NO: u32 = 37;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub age: u32,
}

impl Encode for User {}

impl User {
    pub fn new(id: u32, name: &str, age: u32) -> Self {
        Self {
            id,
            name: name.into(),
            age,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IndexDef {
    pub id: u32,
    pub name: &'static str,
    pub parts: Vec<(u32, &'static str)>,
    /// Store parts as `[[field, type]]` instead of `[{field=, type=}]`.
    pub legacy_parts: bool,
}

impl IndexDef {
    pub fn new(id: u32, name: &'static str, parts: Vec<(u32, &'static str)>) -> Self {
        Self {
            id,
            name,
            parts,
            legacy_parts: false,
        }
    }

    pub fn legacy(mut self) -> Self {
        self.legacy_parts = true;
        self
    }

    fn catalog_row(&self, space_id: SpaceId) -> Value {
        let parts = self
            .parts
            .iter()
            .map(|&(field, ty)| {
                if self.legacy_parts {
                    Value::Array(vec![field.into(), ty.into()])
                } else {
                    Value::Map(vec![
                        ("field".into(), field.into()),
                        ("type".into(), ty.into()),
                        ("is_nullable".into(), false.into()),
                    ])
                }
            })
            .collect();
        Value::Array(vec![
            space_id.into(),
            self.id.into(),
            self.name.into(),
            "tree".into(),
            Value::Map(vec![("unique".into(), true.into())]),
            Value::Array(parts),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct SpaceDef {
    pub id: SpaceId,
    pub name: &'static str,
    pub format: Vec<(&'static str, &'static str)>,
    pub indexes: Vec<IndexDef>,
    pub rows: Vec<Vec<Value>>,
}

impl SpaceDef {
    fn catalog_row(&self) -> Value {
        let format = self
            .format
            .iter()
            .map(|&(name, ty)| {
                Value::Map(vec![("name".into(), name.into()), ("type".into(), ty.into())])
            })
            .collect();
        Value::Array(vec![
            self.id.into(),
            1.into(),
            self.name.into(),
            "memtx".into(),
            0.into(),
            Value::Map(vec![]),
            Value::Array(format),
        ])
    }

    fn index(&self, id: u32) -> Result<&IndexDef, ClientError> {
        self.indexes
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| server_error(ER_NO_SUCH_INDEX_ID, format!("No index #{id} is defined in space '{}'", self.name)))
    }

    fn pk_parts(&self) -> Vec<u32> {
        self.indexes
            .iter()
            .find(|i| i.id == 0)
            .map(|i| i.parts.iter().map(|p| p.0).collect())
            .unwrap_or_default()
    }

    fn position(&self, key: &[Value]) -> Option<usize> {
        let parts = self.pk_parts();
        self.rows
            .iter()
            .position(|row| cmp_keys(&extract(row, &parts), key) == Ordering::Equal)
    }
}

/// `users`: `[id, name, age]`, primary key on `id`, secondary `by_name`
/// stored with legacy parts.
pub fn users_space() -> SpaceDef {
    SpaceDef {
        id: USERS,
        name: "users",
        format: vec![("id", "unsigned"), ("name", "string"), ("age", "unsigned")],
        indexes: vec![
            IndexDef::new(0, "pk", vec![(0, "unsigned")]),
            IndexDef::new(1, "by_name", vec![(1, "string")]).legacy(),
        ],
        rows: vec![],
    }
}

/// `counters`: `[id, hits]`, primary key on `id`.
pub fn counters_space() -> SpaceDef {
    SpaceDef {
        id: COUNTERS,
        name: "counters",
        format: vec![("id", "unsigned"), ("hits", "integer")],
        indexes: vec![IndexDef::new(0, "pk", vec![(0, "unsigned")])],
        rows: vec![],
    }
}

#[derive(Debug, Default)]
pub struct FakeStore {
    spaces: RefCell<Vec<SpaceDef>>,
    log: RefCell<Vec<(IProtoType, Value)>>,
    failures: RefCell<VecDeque<ClientError>>,
    canned: RefCell<VecDeque<Value>>,
    yields: Cell<u32>,
}

impl FakeStore {
    /// A store with `users` and `counters`. Every request yields once before
    /// it is answered.
    pub fn new() -> Rc<Self> {
        Self::with_spaces(vec![users_space(), counters_space()])
    }

    pub fn with_spaces(spaces: Vec<SpaceDef>) -> Rc<Self> {
        let store = Self::default();
        *store.spaces.borrow_mut() = spaces;
        store.yields.set(1);
        Rc::new(store)
    }

    /// The next request fails with `error` after it is logged.
    pub fn fail_next(&self, error: ClientError) {
        self.failures.borrow_mut().push_back(error);
    }

    /// The next request is answered with the response body `body` instead of
    /// being executed.
    pub fn respond_next(&self, body: Value) {
        self.canned.borrow_mut().push_back(body);
    }

    /// Same as [`FakeStore::respond_next`] with a body of `{DATA: rows}`.
    pub fn respond_next_with_rows(&self, rows: Vec<Value>) {
        self.respond_next(Value::Map(vec![(DATA.into(), Value::Array(rows))]));
    }

    pub fn requests(&self) -> Vec<(IProtoType, Value)> {
        self.log.borrow().clone()
    }

    /// Requests of type `ty` logged so far.
    pub fn bodies(&self, ty: IProtoType) -> Vec<Value> {
        self.log
            .borrow()
            .iter()
            .filter(|(t, _)| *t == ty)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Number of selects sent to `_vspace` or `_vindex`.
    pub fn catalog_requests(&self) -> usize {
        let vspace = u64::from(SpaceId::from(SystemSpace::VSpace));
        let vindex = u64::from(SpaceId::from(SystemSpace::VIndex));
        self.bodies(IProtoType::Select)
            .iter()
            .filter(|body| matches!(body_u64(body, SPACE_ID), Some(id) if id == vspace || id == vindex))
            .count()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn rows(&self, space_id: SpaceId) -> Vec<Value> {
        let spaces = self.spaces.borrow();
        let space = spaces.iter().find(|s| s.id == space_id).expect("space exists");
        let parts = space.pk_parts();
        let mut rows = space.rows.clone();
        rows.sort_by(|a, b| cmp_keys(&extract(a, &parts), &extract(b, &parts)));
        rows.into_iter().map(Value::Array).collect()
    }

    fn execute(&self, ty: IProtoType, body: &Value) -> Result<Vec<u8>, ClientError> {
        match ty {
            IProtoType::Select => encode_rows(self.select(body)?),
            IProtoType::Insert => self.insert(body, false).map(|row| encode_rows(vec![row]))?,
            IProtoType::Replace => self.insert(body, true).map(|row| encode_rows(vec![row]))?,
            IProtoType::Update => encode_rows(self.update(body)?),
            IProtoType::Upsert => {
                self.upsert(body)?;
                encode_rows(vec![])
            }
            IProtoType::Delete => encode_rows(self.delete(body)?),
            IProtoType::Call => self.call(body),
            _ => Err(server_error(ER_UNSUPPORTED, "unsupported request type")),
        }
    }

    fn select(&self, body: &Value) -> Result<Vec<Vec<Value>>, ClientError> {
        let space_id = body_u64(body, SPACE_ID).expect("SPACE_ID") as SpaceId;
        let index_id = body_u64(body, INDEX_ID).expect("INDEX_ID") as u32;
        let limit = body_u64(body, LIMIT).expect("LIMIT") as usize;
        let offset = body_u64(body, OFFSET).expect("OFFSET") as usize;
        let iterator = body_u64(body, ITERATOR).expect("ITERATOR");
        let key = body_array(body, KEY);

        let spaces = self.spaces.borrow();
        let (rows, parts): (Vec<Vec<Value>>, Vec<u32>) = if space_id == SpaceId::from(SystemSpace::VSpace) {
            let rows = spaces.iter().map(|s| unwrap_array(s.catalog_row())).collect();
            let parts = match index_id {
                0 => vec![0],
                2 => vec![2],
                _ => return Err(server_error(ER_NO_SUCH_INDEX_ID, "no such _vspace index")),
            };
            (rows, parts)
        } else if space_id == SpaceId::from(SystemSpace::VIndex) {
            let rows = spaces
                .iter()
                .flat_map(|s| s.indexes.iter().map(move |i| unwrap_array(i.catalog_row(s.id))))
                .collect();
            let parts = match index_id {
                0 => vec![0, 1],
                2 => vec![0, 2],
                _ => return Err(server_error(ER_NO_SUCH_INDEX_ID, "no such _vindex index")),
            };
            (rows, parts)
        } else {
            let space = find_space(&spaces, space_id)?;
            let index = space.index(index_id)?;
            let parts = index.parts.iter().map(|p| p.0).collect();
            (space.rows.clone(), parts)
        };

        let mut keyed: Vec<_> = rows
            .into_iter()
            .map(|row| (extract(&row, &parts), row))
            .collect();
        keyed.sort_by(|a, b| cmp_keys(&a.0, &b.0));

        let matching = |k: &[Value]| {
            if key.is_empty() {
                return true;
            }
            let ord = cmp_keys(k, &key);
            match iterator {
                0 | 1 => ord == Ordering::Equal,
                2 => true,
                3 => ord == Ordering::Less,
                4 => ord != Ordering::Greater,
                5 => ord != Ordering::Less,
                6 => ord == Ordering::Greater,
                _ => false,
            }
        };
        let mut found: Vec<_> = keyed
            .into_iter()
            .filter(|(k, _)| matching(k))
            .map(|(_, row)| row)
            .collect();
        if matches!(iterator, 1 | 3 | 4) {
            found.reverse();
        }
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    fn insert(&self, body: &Value, replace: bool) -> Result<Vec<Value>, ClientError> {
        let space_id = body_u64(body, SPACE_ID).expect("SPACE_ID") as SpaceId;
        let tuple = body_array(body, TUPLE);
        let mut spaces = self.spaces.borrow_mut();
        let space = find_space_mut(&mut spaces, space_id)?;
        let key = extract(&tuple, &space.pk_parts());
        match space.position(&key) {
            Some(pos) if replace => space.rows[pos] = tuple.clone(),
            Some(_) => {
                return Err(server_error(
                    ER_TUPLE_FOUND,
                    format!("Duplicate key exists in unique index 'pk' in space '{}'", space.name),
                ))
            }
            None => space.rows.push(tuple.clone()),
        }
        Ok(tuple)
    }

    fn update(&self, body: &Value) -> Result<Vec<Vec<Value>>, ClientError> {
        let space_id = body_u64(body, SPACE_ID).expect("SPACE_ID") as SpaceId;
        let key = body_array(body, KEY);
        let ops = body_array(body, TUPLE);
        let mut spaces = self.spaces.borrow_mut();
        let space = find_space_mut(&mut spaces, space_id)?;
        let Some(pos) = space.position(&key) else {
            return Ok(vec![]);
        };
        let mut row = space.rows[pos].clone();
        apply_ops(&mut row, &ops)?;
        space.rows[pos] = row.clone();
        Ok(vec![row])
    }

    fn upsert(&self, body: &Value) -> Result<(), ClientError> {
        let space_id = body_u64(body, SPACE_ID).expect("SPACE_ID") as SpaceId;
        let tuple = body_array(body, TUPLE);
        let ops = body_array(body, OPS);
        let mut spaces = self.spaces.borrow_mut();
        let space = find_space_mut(&mut spaces, space_id)?;
        let key = extract(&tuple, &space.pk_parts());
        match space.position(&key) {
            Some(pos) => {
                let mut row = space.rows[pos].clone();
                apply_ops(&mut row, &ops)?;
                space.rows[pos] = row;
            }
            None => space.rows.push(tuple),
        }
        Ok(())
    }

    fn delete(&self, body: &Value) -> Result<Vec<Vec<Value>>, ClientError> {
        let space_id = body_u64(body, SPACE_ID).expect("SPACE_ID") as SpaceId;
        let key = body_array(body, KEY);
        let mut spaces = self.spaces.borrow_mut();
        let space = find_space_mut(&mut spaces, space_id)?;
        Ok(space
            .position(&key)
            .map(|pos| space.rows.remove(pos))
            .into_iter()
            .collect())
    }

    fn call(&self, body: &Value) -> Result<Vec<u8>, ClientError> {
        let fn_name = body_get(body, FUNCTION_NAME)
            .and_then(Value::as_str)
            .expect("FUNCTION_NAME")
            .to_owned();
        let args = body_array(body, TUPLE);
        let not_found = || server_error(ER_NO_SUCH_PROC, format!("Procedure '{fn_name}' is not defined"));
        let (space_name, method) = fn_name
            .strip_prefix("box.space.")
            .and_then(|rest| rest.split_once(':'))
            .ok_or_else(not_found)?;

        let mut spaces = self.spaces.borrow_mut();
        let space = spaces
            .iter_mut()
            .find(|s| s.name == space_name)
            .ok_or_else(not_found)?;
        let parts = space.pk_parts();
        let result: Value = match method {
            "len" => (space.rows.len() as u64).into(),
            "count" => {
                let key = args.first().cloned().map(unwrap_array).unwrap_or_default();
                let count = space
                    .rows
                    .iter()
                    .filter(|row| {
                        key.is_empty()
                            || cmp_keys(&extract(row, &parts), &key) == Ordering::Equal
                    })
                    .count();
                Value::from(count as u64)
            }
            "auto_increment" => {
                let rest = args.first().cloned().map(unwrap_array).unwrap_or_default();
                let next = space
                    .rows
                    .iter()
                    .filter_map(|row| row.first().and_then(Value::as_u64))
                    .max()
                    .map_or(1, |max| max + 1);
                let mut row = vec![Value::from(next)];
                row.extend(rest);
                space.rows.push(row.clone());
                Value::Array(row)
            }
            _ => return Err(not_found()),
        };

        let mut buf = Vec::new();
        let response = Value::Map(vec![(DATA.into(), Value::Array(vec![result]))]);
        rmpv::encode::write_value(&mut buf, &response).expect("encoding to vec succeeds");
        Ok(buf)
    }
}

#[async_trait::async_trait(?Send)]
impl AsClient for FakeStore {
    async fn send<R: Request>(&self, request: &R) -> Result<R::Response, ClientError> {
        let mut buf = Vec::new();
        request
            .encode_body(&mut buf)
            .map_err(|e| ClientError::RequestEncode(Box::new(e)))?;
        let body = rmpv::decode::read_value(&mut buf.as_slice()).expect("request body is msgpack");
        self.log.borrow_mut().push((R::TYPE, body.clone()));

        for _ in 0..self.yields.get() {
            YieldNow::default().await;
        }

        let failure = self.failures.borrow_mut().pop_front();
        if let Some(e) = failure {
            return Err(e);
        }
        let canned = self.canned.borrow_mut().pop_front();
        let response = match canned {
            Some(body) => {
                let mut buf = Vec::new();
                rmpv::encode::write_value(&mut buf, &body).expect("encoding to vec succeeds");
                buf
            }
            None => self.execute(R::TYPE, &body)?,
        };
        R::decode_response_body(&mut Cursor::new(response))
            .map_err(|e| ClientError::ResponseDecode(Box::new(e)))
    }
}

/// Returns `Pending` once, waking itself.
#[derive(Default)]
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

////////////////////////////////////////////////////////////////////////////////
// helpers
////////////////////////////////////////////////////////////////////////////////

pub fn server_error(code: u32, message: impl Into<String>) -> ClientError {
    ClientError::ErrorResponse(ServerError {
        code,
        message: message.into(),
    })
}

fn find_space(spaces: &[SpaceDef], id: SpaceId) -> Result<&SpaceDef, ClientError> {
    spaces
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| server_error(36, format!("Space '{id}' does not exist")))
}

fn find_space_mut(spaces: &mut [SpaceDef], id: SpaceId) -> Result<&mut SpaceDef, ClientError> {
    spaces
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| server_error(36, format!("Space '{id}' does not exist")))
}

fn encode_rows(rows: Vec<Vec<Value>>) -> Result<Vec<u8>, ClientError> {
    let rows = rows
        .iter()
        .map(|row| Tuple::from_values(row))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ClientError::ResponseDecode(Box::new(e)))?;
    let mut buf = Vec::new();
    codec::encode_data(&mut buf, rows.iter()).map_err(|e| ClientError::ResponseDecode(Box::new(e)))?;
    Ok(buf)
}

pub fn body_get(body: &Value, key: u8) -> Option<&Value> {
    body.as_map()?
        .iter()
        .find(|(k, _)| k.as_u64() == Some(u64::from(key)))
        .map(|(_, v)| v)
}

fn body_u64(body: &Value, key: u8) -> Option<u64> {
    body_get(body, key)?.as_u64()
}

fn body_array(body: &Value, key: u8) -> Vec<Value> {
    body_get(body, key).cloned().map(unwrap_array).unwrap_or_default()
}

fn unwrap_array(v: Value) -> Vec<Value> {
    match v {
        Value::Array(a) => a,
        other => panic!("expected array, got {other}"),
    }
}

fn extract(row: &[Value], parts: &[u32]) -> Vec<Value> {
    parts
        .iter()
        .map(|&f| row.get(f as usize).cloned().unwrap_or(Value::Nil))
        .collect()
}

fn cmp_value(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.as_u64().cmp(&y.as_u64()),
        },
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Compares `k` with the prefix `key`.
fn cmp_keys(k: &[Value], key: &[Value]) -> Ordering {
    for (a, b) in k.iter().zip(key) {
        match cmp_value(a, b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn apply_ops(row: &mut Vec<Value>, ops: &[Value]) -> Result<(), ClientError> {
    for op in ops {
        let op = op.as_array().expect("update op is an array");
        let kind = op[0].as_str().expect("op kind");
        let field = op[1].as_u64().expect("field no") as usize;
        let missing = || server_error(ER_NO_SUCH_FIELD_NO, format!("Field {field} was not found in the tuple"));
        match kind {
            "+" | "-" | "&" | "|" | "^" => {
                let current = row.get(field).and_then(Value::as_i64).ok_or_else(missing)?;
                let arg = op[2].as_i64().expect("integer operand");
                row[field] = match kind {
                    "+" => current + arg,
                    "-" => current - arg,
                    "&" => current & arg,
                    "|" => current | arg,
                    _ => current ^ arg,
                }
                .into();
            }
            "=" if field == row.len() => row.push(op[2].clone()),
            "=" => *row.get_mut(field).ok_or_else(missing)? = op[2].clone(),
            "!" if field <= row.len() => row.insert(field, op[2].clone()),
            "!" => return Err(missing()),
            "#" => {
                let count = op[2].as_u64().expect("count") as usize;
                if field + count > row.len() {
                    return Err(missing());
                }
                row.drain(field..field + count);
            }
            ":" => {
                let s = row.get(field).and_then(Value::as_str).ok_or_else(missing)?;
                let start = op[2].as_i64().expect("start");
                let count = op[3].as_u64().expect("count") as usize;
                let start = if start < 0 {
                    s.len() - (-start) as usize
                } else {
                    start as usize
                };
                let mut s = s.to_owned();
                let end = (start + count).min(s.len());
                s.replace_range(start..end, op[4].as_str().expect("paste"));
                row[field] = s.into();
            }
            other => panic!("unknown update op '{other}'"),
        }
    }
    Ok(())
}
