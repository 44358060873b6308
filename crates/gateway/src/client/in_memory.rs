use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Page, StockGateway};
use crate::error::GatewayError;
use crate::filter::{Condition, Filter, Operator, Term};
use stockbridge_core::record::{self as rec, Record};

/// A call the backend received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub collection: String,
    pub method: String,
    pub ids: Vec<i64>,
}

#[derive(Debug)]
struct InjectedFault {
    collection: String,
    method: String,
    message: String,
}

#[derive(Debug, Default)]
struct BackendState {
    next_id: i64,
    tables: HashMap<String, BTreeMap<i64, Record>>,
    journal: Vec<RecordedCall>,
    faults: Vec<InjectedFault>,
}

/// Fields holding a relation id; `read` renders them as `[id, "name"]` pairs
/// like the real backend does.
const RELATIONS: &[&str] = &[
    "product_id",
    "location_id",
    "location_dest_id",
    "picking_id",
    "picking_type_id",
    "move_id",
    "product_uom",
];

const PICKING: &str = "stock.picking";
const MOVE: &str = "stock.move";
const MOVE_LINE: &str = "stock.move.line";
const QUANT: &str = "stock.quant";

/// In-memory stand-in for the stock backend.
///
/// Intended for tests/dev. Reproduces the picking workflow (confirm, reserve
/// against available stock, validate, cancel) and quant inventory application
/// closely enough to exercise the orchestration layer, and can be told to
/// fail a specific call.
#[derive(Debug, Default)]
pub struct InMemoryStockBackend {
    state: Mutex<BackendState>,
}

fn user_error(message: impl Into<String>) -> GatewayError {
    GatewayError::fault(200, Some("odoo.exceptions.UserError".to_string()), message)
}

fn missing(collection: &str, id: i64) -> GatewayError {
    GatewayError::fault(
        200,
        Some("odoo.exceptions.MissingError".to_string()),
        format!("Record does not exist or has been deleted. ({collection}({id},))"),
    )
}

impl InMemoryStockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the `internal` transfer type configured.
    pub fn with_internal_picking_type() -> Self {
        let backend = Self::new();
        backend.seed(
            "stock.picking.type",
            json!({"name": "Internal Transfers", "code": "internal"}),
        );
        backend
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BackendState>, GatewayError> {
        self.state
            .lock()
            .map_err(|_| GatewayError::Transport("lock poisoned".to_string()))
    }

    /// Insert a record directly, bypassing the journal. Returns its id.
    pub fn seed(&self, collection: &str, values: Value) -> i64 {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let values = match values {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        st.insert(collection, values)
    }

    pub fn seed_quant(&self, product_id: i64, location_id: i64, quantity: f64) -> i64 {
        self.seed(
            QUANT,
            json!({
                "product_id": product_id,
                "location_id": location_id,
                "quantity": quantity,
                "reserved_quantity": 0.0,
                "inventory_quantity": 0.0,
                "inventory_quantity_set": false,
            }),
        )
    }

    /// On-hand quantity of a product at a location, if a quant exists.
    pub fn quant_quantity(&self, product_id: i64, location_id: i64) -> Option<f64> {
        let st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        st.find_quant(product_id, location_id)
            .and_then(|id| st.get(QUANT, id))
            .map(|q| rec::float(q, "quantity").unwrap_or(0.0))
    }

    /// Stored records of a collection, ids ascending.
    pub fn records(&self, collection: &str) -> Vec<Record> {
        let st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        st.tables
            .get(collection)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn record(&self, collection: &str, id: i64) -> Option<Record> {
        let st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        st.get(collection, id).cloned()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .journal
            .clone()
    }

    /// Methods called so far, as `collection.method` strings.
    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| format!("{}.{}", c.collection, c.method))
            .collect()
    }

    /// Make the next `method` call on `collection` fail with a user error.
    pub fn fail_next(&self, collection: &str, method: &str, message: &str) {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        st.faults.push(InjectedFault {
            collection: collection.to_string(),
            method: method.to_string(),
            message: message.to_string(),
        });
    }

    /// Journal the call, then trip an injected fault if one matches.
    fn enter(
        &self,
        collection: &str,
        method: &str,
        ids: &[i64],
    ) -> Result<std::sync::MutexGuard<'_, BackendState>, GatewayError> {
        let mut st = self.lock()?;
        st.journal.push(RecordedCall {
            collection: collection.to_string(),
            method: method.to_string(),
            ids: ids.to_vec(),
        });
        if let Some(pos) = st
            .faults
            .iter()
            .position(|f| f.collection == collection && f.method == method)
        {
            let fault = st.faults.remove(pos);
            return Err(user_error(fault.message));
        }
        Ok(st)
    }
}

impl BackendState {
    fn insert(&mut self, collection: &str, values: Record) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        let mut values = values;
        values.insert("id".to_string(), json!(id));
        self.tables
            .entry(collection.to_string())
            .or_default()
            .insert(id, values);
        id
    }

    fn get(&self, collection: &str, id: i64) -> Option<&Record> {
        self.tables.get(collection).and_then(|t| t.get(&id))
    }

    fn get_mut(&mut self, collection: &str, id: i64) -> Result<&mut Record, GatewayError> {
        self.tables
            .get_mut(collection)
            .and_then(|t| t.get_mut(&id))
            .ok_or_else(|| missing(collection, id))
    }

    fn ids_where(&self, collection: &str, pred: impl Fn(&Record) -> bool) -> Vec<i64> {
        self.tables
            .get(collection)
            .map(|t| t.iter().filter(|(_, r)| pred(r)).map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    fn find_quant(&self, product_id: i64, location_id: i64) -> Option<i64> {
        self.ids_where(QUANT, |r| {
            relation(r, "product_id") == Some(product_id) && relation(r, "location_id") == Some(location_id)
        })
        .into_iter()
        .next()
    }

    fn set(&mut self, collection: &str, id: i64, field: &str, value: Value) -> Result<(), GatewayError> {
        self.get_mut(collection, id)?.insert(field.to_string(), value);
        Ok(())
    }

    /// Add `delta` to a quant's field, creating the quant when absent.
    fn bump_quant(&mut self, product_id: i64, location_id: i64, field: &str, delta: f64) -> Result<(), GatewayError> {
        let id = match self.find_quant(product_id, location_id) {
            Some(id) => id,
            None => {
                let mut values = Record::new();
                values.insert("product_id".to_string(), json!(product_id));
                values.insert("location_id".to_string(), json!(location_id));
                values.insert("quantity".to_string(), json!(0.0));
                values.insert("reserved_quantity".to_string(), json!(0.0));
                values.insert("inventory_quantity".to_string(), json!(0.0));
                values.insert("inventory_quantity_set".to_string(), json!(false));
                self.insert(QUANT, values)
            }
        };
        let quant = self.get_mut(QUANT, id)?;
        let current = rec::float(quant, field).unwrap_or(0.0);
        quant.insert(field.to_string(), json!(current + delta));
        Ok(())
    }

    fn picking_state(&self, id: i64) -> Result<String, GatewayError> {
        self.get(PICKING, id)
            .ok_or_else(|| missing(PICKING, id))
            .map(|p| rec::text(p, "state").unwrap_or_default())
    }

    fn moves_of(&self, picking_id: i64) -> Vec<i64> {
        self.ids_where(MOVE, |r| relation(r, "picking_id") == Some(picking_id))
    }

    fn lines_of(&self, picking_id: i64) -> Vec<i64> {
        self.ids_where(MOVE_LINE, |r| relation(r, "picking_id") == Some(picking_id))
    }

    fn confirm(&mut self, ids: &[i64]) -> Result<Value, GatewayError> {
        for &pid in ids {
            if self.picking_state(pid)? != "draft" {
                return Err(user_error("Only draft transfers can be confirmed."));
            }
            if self.moves_of(pid).is_empty() {
                return Err(user_error("Please add some items to move."));
            }
            for mid in self.moves_of(pid) {
                self.set(MOVE, mid, "state", json!("confirmed"))?;
            }
            self.set(PICKING, pid, "state", json!("confirmed"))?;
        }
        Ok(json!(true))
    }

    /// Reserve as much of each move as the source quant can cover.
    fn assign(&mut self, ids: &[i64]) -> Result<Value, GatewayError> {
        for &pid in ids {
            let state = self.picking_state(pid)?;
            if !matches!(state.as_str(), "confirmed" | "waiting" | "assigned") {
                return Err(user_error(format!("Cannot reserve a transfer in state '{state}'.")));
            }

            let mut any_reserved = false;
            for mid in self.moves_of(pid) {
                let mv = self.get(MOVE, mid).cloned().ok_or_else(|| missing(MOVE, mid))?;
                let product = relation(&mv, "product_id").unwrap_or_default();
                let src = relation(&mv, "location_id").unwrap_or_default();
                let dest = relation(&mv, "location_dest_id").unwrap_or_default();
                let requested = rec::float(&mv, "product_uom_qty").unwrap_or(0.0);

                let already: f64 = self
                    .ids_where(MOVE_LINE, |r| relation(r, "move_id") == Some(mid))
                    .into_iter()
                    .filter_map(|lid| self.get(MOVE_LINE, lid))
                    .map(|l| rec::float(l, "reserved_quantity").unwrap_or(0.0))
                    .sum();

                let available = self
                    .find_quant(product, src)
                    .and_then(|q| self.get(QUANT, q))
                    .map(|q| {
                        rec::float(q, "quantity").unwrap_or(0.0) - rec::float(q, "reserved_quantity").unwrap_or(0.0)
                    })
                    .unwrap_or(0.0)
                    .max(0.0);

                let take = (requested - already).max(0.0).min(available);
                if take > 0.0 {
                    self.bump_quant(product, src, "reserved_quantity", take)?;
                    let mut line = Record::new();
                    line.insert("picking_id".to_string(), json!(pid));
                    line.insert("move_id".to_string(), json!(mid));
                    line.insert("product_id".to_string(), json!(product));
                    line.insert("location_id".to_string(), json!(src));
                    line.insert("location_dest_id".to_string(), json!(dest));
                    line.insert("quantity".to_string(), json!(take));
                    line.insert("reserved_quantity".to_string(), json!(take));
                    self.insert(MOVE_LINE, line);
                }

                let reserved = already + take;
                let move_state = if reserved >= requested {
                    "assigned"
                } else if reserved > 0.0 {
                    "partially_available"
                } else {
                    "confirmed"
                };
                any_reserved |= reserved > 0.0;
                self.set(MOVE, mid, "state", json!(move_state))?;
            }

            let picking_state = if any_reserved { "assigned" } else { "confirmed" };
            self.set(PICKING, pid, "state", json!(picking_state))?;
        }
        Ok(json!(true))
    }

    /// Book every line's quantity from source to destination.
    fn validate(&mut self, ids: &[i64]) -> Result<Value, GatewayError> {
        for &pid in ids {
            let state = self.picking_state(pid)?;
            if matches!(state.as_str(), "done" | "cancel") {
                return Err(user_error(format!("Transfer is already {state}.")));
            }

            let lines: Vec<Record> = self
                .lines_of(pid)
                .into_iter()
                .filter_map(|lid| self.get(MOVE_LINE, lid).cloned())
                .collect();
            let total: f64 = lines.iter().map(|l| rec::float(l, "quantity").unwrap_or(0.0)).sum();
            if total <= 0.0 {
                return Err(user_error(
                    "You cannot validate a transfer if no quantities are reserved nor done.",
                ));
            }

            for line in &lines {
                let product = relation(line, "product_id").unwrap_or_default();
                let src = relation(line, "location_id").unwrap_or_default();
                let dest = relation(line, "location_dest_id").unwrap_or_default();
                let qty = rec::float(line, "quantity").unwrap_or(0.0);
                let reserved = rec::float(line, "reserved_quantity").unwrap_or(0.0);

                self.bump_quant(product, src, "reserved_quantity", -reserved)?;
                self.bump_quant(product, src, "quantity", -qty)?;
                self.bump_quant(product, dest, "quantity", qty)?;
            }

            for mid in self.moves_of(pid) {
                self.set(MOVE, mid, "state", json!("done"))?;
            }
            self.set(PICKING, pid, "state", json!("done"))?;
        }
        Ok(json!(true))
    }

    /// Release reservations, drop lines, mark everything cancelled.
    fn cancel(&mut self, ids: &[i64]) -> Result<Value, GatewayError> {
        for &pid in ids {
            if self.picking_state(pid)? == "done" {
                return Err(user_error("You cannot cancel a transfer that is done."));
            }
            for lid in self.lines_of(pid) {
                let line = self.get(MOVE_LINE, lid).cloned().ok_or_else(|| missing(MOVE_LINE, lid))?;
                let product = relation(&line, "product_id").unwrap_or_default();
                let src = relation(&line, "location_id").unwrap_or_default();
                let reserved = rec::float(&line, "reserved_quantity").unwrap_or(0.0);
                self.bump_quant(product, src, "reserved_quantity", -reserved)?;
                if let Some(t) = self.tables.get_mut(MOVE_LINE) {
                    t.remove(&lid);
                }
            }
            for mid in self.moves_of(pid) {
                self.set(MOVE, mid, "state", json!("cancel"))?;
            }
            self.set(PICKING, pid, "state", json!("cancel"))?;
        }
        Ok(json!(true))
    }

    /// Promote each staged `inventory_quantity` to `quantity`.
    fn apply_inventory(&mut self, ids: &[i64]) -> Result<Value, GatewayError> {
        for &qid in ids {
            let quant = self.get_mut(QUANT, qid)?;
            if rec::flag(quant, "inventory_quantity_set") {
                let staged = rec::float(quant, "inventory_quantity").unwrap_or(0.0);
                quant.insert("quantity".to_string(), json!(staged));
                quant.insert("inventory_quantity".to_string(), json!(0.0));
                quant.insert("inventory_quantity_set".to_string(), json!(false));
            }
        }
        Ok(Value::Null)
    }

    fn search(&self, collection: &str, filter: &Filter, page: &Page) -> Vec<i64> {
        let mut matched: Vec<&Record> = self
            .tables
            .get(collection)
            .map(|t| t.values().filter(|r| matches_filter(filter.terms(), r)).collect())
            .unwrap_or_default();

        let keys = parse_order(&page.order);
        matched.sort_by(|a, b| {
            for (field, desc) in &keys {
                let ord = compare(&scalar(a, field), &scalar(b, field));
                let ord = if *desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            let tie = compare(&scalar(a, "id"), &scalar(b, "id"));
            match keys.last() {
                Some((_, true)) => tie.reverse(),
                _ => tie,
            }
        });

        matched
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit.map(|l| l as usize).unwrap_or(usize::MAX))
            .filter_map(|r| rec::record_id(r).ok())
            .collect()
    }

    fn read(&self, collection: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Record>, GatewayError> {
        ids.iter()
            .map(|&id| {
                let stored = self.get(collection, id).ok_or_else(|| missing(collection, id))?;
                Ok(render(stored, fields))
            })
            .collect()
    }
}

fn relation(r: &Record, field: &str) -> Option<i64> {
    rec::many2one(r, field).ok().flatten()
}

/// Project `fields` (all when empty), rendering relations as `[id, name]`.
fn render(stored: &Record, fields: &[&str]) -> Record {
    let mut out = Record::new();
    let mut put = |name: &str, value: &Value| {
        let value = match value {
            Value::Number(n) if RELATIONS.contains(&name) => json!([n, format!("#{n}")]),
            other => other.clone(),
        };
        out.insert(name.to_string(), value);
    };

    if fields.is_empty() {
        for (k, v) in stored {
            put(k.as_str(), v);
        }
    } else {
        put("id", stored.get("id").unwrap_or(&Value::Bool(false)));
        for f in fields {
            put(*f, stored.get(*f).unwrap_or(&Value::Bool(false)));
        }
    }
    out
}

/// Field value with relations collapsed to their id; missing reads as `false`.
fn scalar(r: &Record, field: &str) -> Value {
    match r.get(field) {
        Some(Value::Array(pair)) => pair.first().cloned().unwrap_or(Value::Bool(false)),
        Some(v) => v.clone(),
        None => Value::Bool(false),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn parse_order(order: &str) -> Vec<(String, bool)> {
    order
        .split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let field = words.next()?.to_string();
            let desc = words.next().is_some_and(|w| w.eq_ignore_ascii_case("desc"));
            Some((field, desc))
        })
        .collect()
}

fn matches_condition(c: &Condition, r: &Record) -> bool {
    let actual = scalar(r, &c.field);
    match c.op {
        Operator::Eq => loosely_equal(&actual, &c.value),
        Operator::Ne => !loosely_equal(&actual, &c.value),
        Operator::Lt => compare(&actual, &c.value) == Ordering::Less,
        Operator::Le => compare(&actual, &c.value) != Ordering::Greater,
        Operator::Gt => compare(&actual, &c.value) == Ordering::Greater,
        Operator::Ge => compare(&actual, &c.value) != Ordering::Less,
        Operator::In | Operator::NotIn => {
            let hit = c
                .value
                .as_array()
                .is_some_and(|vs| vs.iter().any(|v| loosely_equal(&actual, v)));
            hit == (c.op == Operator::In)
        }
        Operator::Ilike => match (&actual, &c.value) {
            (Value::String(a), Value::String(needle)) => {
                a.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => false,
        },
    }
}

/// Evaluate one prefix expression starting at `pos`; returns (value, next pos).
fn eval_expr(terms: &[Term], pos: usize, r: &Record) -> (bool, usize) {
    match terms.get(pos) {
        Some(Term::And) => {
            let (a, p) = eval_expr(terms, pos + 1, r);
            let (b, p) = eval_expr(terms, p, r);
            (a && b, p)
        }
        Some(Term::Or) => {
            let (a, p) = eval_expr(terms, pos + 1, r);
            let (b, p) = eval_expr(terms, p, r);
            (a || b, p)
        }
        Some(Term::Not) => {
            let (a, p) = eval_expr(terms, pos + 1, r);
            (!a, p)
        }
        Some(Term::Cond(c)) => (matches_condition(c, r), pos + 1),
        None => (true, pos),
    }
}

fn matches_filter(terms: &[Term], r: &Record) -> bool {
    let mut pos = 0;
    let mut all = true;
    while pos < terms.len() {
        let (v, next) = eval_expr(terms, pos, r);
        all &= v;
        pos = next;
    }
    all
}

#[async_trait]
impl StockGateway for InMemoryStockBackend {
    async fn find(&self, collection: &str, filter: &Filter, page: &Page) -> Result<Vec<i64>, GatewayError> {
        let st = self.enter(collection, "search", &[])?;
        Ok(st.search(collection, filter, page))
    }

    async fn fetch(&self, collection: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Record>, GatewayError> {
        let st = self.enter(collection, "read", ids)?;
        st.read(collection, ids, fields)
    }

    async fn find_and_fetch(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &[&str],
        page: &Page,
    ) -> Result<Vec<Record>, GatewayError> {
        let st = self.enter(collection, "search_read", &[])?;
        let ids = st.search(collection, filter, page);
        st.read(collection, &ids, fields)
    }

    async fn create(&self, collection: &str, values: Record) -> Result<i64, GatewayError> {
        let mut st = self.enter(collection, "create", &[])?;
        let mut values = values;
        match collection {
            PICKING => {
                values.entry("state").or_insert(json!("draft"));
            }
            MOVE => {
                let pid = relation(&values, "picking_id")
                    .ok_or_else(|| user_error("A move needs a transfer."))?;
                if st.get(PICKING, pid).is_none() {
                    return Err(missing(PICKING, pid));
                }
                values.entry("state").or_insert(json!("draft"));
                values.entry("date").or_insert(json!(chrono::Utc::now().to_rfc3339()));
            }
            QUANT => {
                let product = relation(&values, "product_id").unwrap_or_default();
                let location = relation(&values, "location_id").unwrap_or_default();
                if st.find_quant(product, location).is_some() {
                    return Err(GatewayError::fault(
                        200,
                        Some("odoo.exceptions.ValidationError".to_string()),
                        "A quant already exists for this product and location.",
                    ));
                }
                values.entry("quantity").or_insert(json!(0.0));
                values.entry("reserved_quantity").or_insert(json!(0.0));
            }
            _ => {}
        }
        Ok(st.insert(collection, values))
    }

    async fn update(&self, collection: &str, ids: &[i64], values: Record) -> Result<bool, GatewayError> {
        let mut st = self.enter(collection, "write", ids)?;
        for &id in ids {
            let stored = st.get_mut(collection, id)?;
            for (k, v) in &values {
                stored.insert(k.clone(), v.clone());
            }
        }
        Ok(true)
    }

    async fn remove(&self, collection: &str, ids: &[i64]) -> Result<bool, GatewayError> {
        let mut st = self.enter(collection, "unlink", ids)?;
        for &id in ids {
            if st.get(collection, id).is_none() {
                return Err(missing(collection, id));
            }
        }
        if let Some(t) = st.tables.get_mut(collection) {
            for id in ids {
                t.remove(id);
            }
        }
        Ok(true)
    }

    async fn invoke(
        &self,
        collection: &str,
        action: &str,
        ids: &[i64],
        _extra_args: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        let mut st = self.enter(collection, action, ids)?;
        match (collection, action) {
            (PICKING, "action_confirm") => st.confirm(ids),
            (PICKING, "action_assign") => st.assign(ids),
            (PICKING, "button_validate") => st.validate(ids),
            (PICKING, "action_cancel") => st.cancel(ids),
            (QUANT, "action_apply_inventory") => st.apply_inventory(ids),
            _ => Err(GatewayError::fault(
                2,
                Some("builtins.AttributeError".to_string()),
                format!("The method '{action}' does not exist on the model '{collection}'"),
            )),
        }
    }

    async fn server_version(&self) -> Result<Value, GatewayError> {
        drop(self.enter("common", "version", &[])?);
        Ok(json!({"server_version": "17.0", "server_serie": "17.0", "protocol_version": 1}))
    }

    async fn authenticated_uid(&self) -> Result<i64, GatewayError> {
        Ok(1)
    }
}
