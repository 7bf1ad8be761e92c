use crate::domain::model::{FieldChange, Filter, Page, Record};
use crate::domain::ports::KeyValueStore;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::Value;
use std::collections::HashMap;

type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: DynamoClient,
}

impl DynamoStore {
    pub fn new(client: DynamoClient) -> Self {
        Self { client }
    }
}

pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

/// DynamoDB numbers carry up to 38 digits; the decimal text is kept as is
/// so a read-modify-write does not round it through f64.
fn number_value(n: &str) -> Value {
    serde_json::from_str::<serde_json::Number>(n.trim())
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(n.to_string()))
}

pub fn from_attribute(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_value(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute(v)))
                .collect(),
        ),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
        }
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| number_value(n)).collect()),
        AttributeValue::B(blob) => Value::String(format!("<{} bytes>", blob.as_ref().len())),
        AttributeValue::Bs(blobs) => Value::String(format!("<{} binary values>", blobs.len())),
        _ => Value::Null,
    }
}

pub fn to_item(record: &Record) -> Item {
    record
        .data
        .iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect()
}

pub fn from_item(item: &Item) -> Record {
    Record {
        data: item
            .iter()
            .map(|(k, v)| (k.clone(), from_attribute(v)))
            .collect(),
    }
}

/// `SET #f0 = :v0, #f1 = :v1 REMOVE #f2` 形式的更新表達式
pub fn update_expression(
    changes: &[FieldChange],
) -> (String, HashMap<String, String>, HashMap<String, AttributeValue>) {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut sets = Vec::new();
    let mut removes = Vec::new();

    for (i, change) in changes.iter().enumerate() {
        let name = format!("#f{}", i);
        match change {
            FieldChange::Set(field, value) => {
                let placeholder = format!(":v{}", i);
                sets.push(format!("{} = {}", name, placeholder));
                names.insert(name, field.clone());
                values.insert(placeholder, to_attribute(value));
            }
            FieldChange::Remove(field) => {
                removes.push(name.clone());
                names.insert(name, field.clone());
            }
        }
    }

    let mut clauses = Vec::new();
    if !sets.is_empty() {
        clauses.push(format!("SET {}", sets.join(", ")));
    }
    if !removes.is_empty() {
        clauses.push(format!("REMOVE {}", removes.join(", ")));
    }
    (clauses.join(" "), names, values)
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn scan_page(
        &self,
        table: &str,
        filter: Option<&Filter>,
        start_key: Option<Record>,
    ) -> Result<Page<Record, Record>> {
        let mut request = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(start_key.as_ref().map(to_item));

        if let Some(filter) = filter {
            request = request
                .filter_expression("#f = :v")
                .expression_attribute_names("#f", &filter.attribute)
                .expression_attribute_values(":v", to_attribute(&filter.value));
        }

        let output = request
            .send()
            .await
            .map_err(|e| OpsError::service("dynamodb", "scan", e))?;

        let items = output.items().iter().map(from_item).collect::<Vec<_>>();
        tracing::debug!("Scanned {} items from {}", items.len(), table);

        Ok(Page {
            items,
            next: output.last_evaluated_key().map(from_item),
        })
    }

    async fn get_item(&self, table: &str, key: Record) -> Result<Option<Record>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_item(&key)))
            .send()
            .await
            .map_err(|e| OpsError::service("dynamodb", "get_item", e))?;

        Ok(output.item().map(from_item))
    }

    async fn put_item(&self, table: &str, item: Record) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_item(&item)))
            .send()
            .await
            .map_err(|e| OpsError::service("dynamodb", "put_item", e))?;
        Ok(())
    }

    async fn update_item(&self, table: &str, key: Record, changes: Vec<FieldChange>) -> Result<()> {
        let (expression, names, values) = update_expression(&changes);

        self.client
            .update_item()
            .table_name(table)
            .set_key(Some(to_item(&key)))
            .update_expression(expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .send()
            .await
            .map_err(|e| OpsError::service("dynamodb", "update_item", e))?;
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Record) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_item(&key)))
            .send()
            .await
            .map_err(|e| OpsError::service("dynamodb", "delete_item", e))?;
        Ok(())
    }
}
