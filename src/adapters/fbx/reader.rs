//! FBX loading through `fbxcel-dom`, plus lookups over its raw node tree.

use crate::utils::error::{HostError, HostResult};
use fbxcel_dom::any::AnyDocument;
use fbxcel_dom::fbxcel::low::v7400::AttributeValue;
use fbxcel_dom::fbxcel::tree::v7400::NodeHandle;
use fbxcel_dom::v7400::Document;
use std::io::Cursor;

const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \x00";

/// 載入二進位 FBX（7.4 / 7.5）；ASCII FBX 直接拒絕
pub fn load(data: &[u8]) -> HostResult<Box<Document>> {
    if !data.starts_with(BINARY_MAGIC) {
        let head = String::from_utf8_lossy(&data[..data.len().min(1024)]);
        if head.contains("FBXHeaderExtension") || head.trim_start().starts_with(';') {
            return Err(HostError::fbx("ASCII FBX files are not supported"));
        }
        return Err(HostError::fbx("missing binary FBX header"));
    }

    match AnyDocument::from_seekable_reader(Cursor::new(data)) {
        Ok(AnyDocument::V7400(version, document)) => {
            tracing::debug!("FBX document loaded, version {:?}", version);
            Ok(document)
        }
        Ok(_) => Err(HostError::fbx("unsupported FBX version")),
        Err(e) => Err(HostError::fbx(format!("failed to load document: {}", e))),
    }
}

pub fn child<'a>(node: NodeHandle<'a>, name: &str) -> Option<NodeHandle<'a>> {
    node.children().find(|c| c.name() == name)
}

pub fn children_named<'a>(
    node: NodeHandle<'a>,
    name: &'a str,
) -> impl Iterator<Item = NodeHandle<'a>> + 'a {
    node.children().filter(move |c| c.name() == name)
}

pub fn attribute<'a>(node: NodeHandle<'a>, index: usize) -> Option<&'a AttributeValue> {
    node.attributes().get(index)
}

/// `Properties70` 底下名稱為 `name` 的 `P` 節點
pub fn property70<'a>(node: NodeHandle<'a>, name: &str) -> Option<NodeHandle<'a>> {
    children_named(child(node, "Properties70")?, "P")
        .find(|p| attribute(*p, 0).and_then(as_str) == Some(name))
}

pub fn as_i64(value: &AttributeValue) -> Option<i64> {
    match value {
        AttributeValue::Bool(v) => Some(i64::from(*v)),
        AttributeValue::I16(v) => Some(i64::from(*v)),
        AttributeValue::I32(v) => Some(i64::from(*v)),
        AttributeValue::I64(v) => Some(*v),
        _ => None,
    }
}

pub fn as_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::F32(v) => Some(f64::from(*v)),
        AttributeValue::F64(v) => Some(*v),
        other => as_i64(other).map(|v| v as f64),
    }
}

pub fn as_str(value: &AttributeValue) -> Option<&str> {
    match value {
        AttributeValue::String(s) => Some(s.as_str()),
        _ => None,
    }
}

pub fn to_f64_vec(value: &AttributeValue) -> Option<Vec<f64>> {
    match value {
        AttributeValue::ArrF64(v) => Some(v.clone()),
        AttributeValue::ArrF32(v) => Some(v.iter().map(|x| f64::from(*x)).collect()),
        _ => None,
    }
}

pub fn to_i64_vec(value: &AttributeValue) -> Option<Vec<i64>> {
    match value {
        AttributeValue::ArrI32(v) => Some(v.iter().map(|x| i64::from(*x)).collect()),
        AttributeValue::ArrI64(v) => Some(v.clone()),
        _ => None,
    }
}
