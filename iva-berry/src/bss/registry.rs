//! 算法注册表: 名称 -> 分离算法.

use super::{AuxIva, NaturalGradient, Separator};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

static REGISTRY: Lazy<BTreeMap<&'static str, Box<dyn Separator>>> = Lazy::new(|| {
    let mut m: BTreeMap<&'static str, Box<dyn Separator>> = BTreeMap::new();
    m.insert("auxiva", Box::new(AuxIva::Ip));
    m.insert("auxiva-iss", Box::new(AuxIva::Iss));
    m.insert("iva-ng", Box::new(NaturalGradient));
    m
});

/// 按名称查找算法.
#[inline]
pub fn lookup(name: &str) -> Option<&'static dyn Separator> {
    REGISTRY.get(name).map(|b| b.as_ref())
}

/// 该算法是否为 "双通道更新" 算法. 未知名称返回 `None`.
#[inline]
pub fn is_dual_update(name: &str) -> Option<bool> {
    lookup(name).map(|a| a.is_dual_update())
}

/// 所有已注册的算法名称 (字典序).
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}
