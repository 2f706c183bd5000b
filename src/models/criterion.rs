//! 评分维度
//!
//! 四个固定的 Cambridge 评分维度，以及保证"恰好四个键"的 `CriterionMap`

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 每个维度的满分
pub const MAX_CRITERION_SCORE: u8 = 5;

/// 评分维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    Content,
    CommunicativeAchievement,
    Organisation,
    Language,
}

impl Criterion {
    /// 固定顺序，报告布局依赖这个顺序
    pub const ALL: [Criterion; 4] = [
        Criterion::Content,
        Criterion::CommunicativeAchievement,
        Criterion::Organisation,
        Criterion::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Content => "content",
            Criterion::CommunicativeAchievement => "communicative-achievement",
            Criterion::Organisation => "organisation",
            Criterion::Language => "language",
        }
    }

    fn index(&self) -> usize {
        match self {
            Criterion::Content => 0,
            Criterion::CommunicativeAchievement => 1,
            Criterion::Organisation => 2,
            Criterion::Language => 3,
        }
    }

    /// 整篇作文的满分：5 × 4 = 20
    pub fn max_total_score() -> u32 {
        MAX_CRITERION_SCORE as u32 * Self::ALL.len() as u32
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 以评分维度为键的映射，结构上保证恰好包含四个维度
///
/// 序列化为 JSON 对象，键的顺序与 `Criterion::ALL` 一致
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CriterionMap<T> {
    entries: [T; 4],
}

impl<T> CriterionMap<T> {
    /// 为每个维度计算一个值
    pub fn from_fn(mut f: impl FnMut(Criterion) -> T) -> Self {
        Self {
            entries: Criterion::ALL.map(&mut f),
        }
    }

    /// 按固定顺序遍历 (维度, 值)
    pub fn iter(&self) -> impl Iterator<Item = (Criterion, &T)> {
        Criterion::ALL.into_iter().zip(self.entries.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Criterion, &T) -> U) -> CriterionMap<U> {
        CriterionMap::from_fn(|c| f(c, &self[c]))
    }
}

impl<T> Index<Criterion> for CriterionMap<T> {
    type Output = T;

    fn index(&self, criterion: Criterion) -> &T {
        &self.entries[criterion.index()]
    }
}

impl<T> IndexMut<Criterion> for CriterionMap<T> {
    fn index_mut(&mut self, criterion: Criterion) -> &mut T {
        &mut self.entries[criterion.index()]
    }
}

impl<T: Serialize> Serialize for CriterionMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (criterion, value) in self.iter() {
            map.serialize_entry(criterion.as_str(), value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for CriterionMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // 未知的维度名会在反序列化 Criterion 时报错
        let mut raw: HashMap<Criterion, T> = HashMap::deserialize(deserializer)?;
        let mut values = Vec::with_capacity(Criterion::ALL.len());
        for criterion in Criterion::ALL {
            let value = raw
                .remove(&criterion)
                .ok_or_else(|| D::Error::custom(format!("缺少评分维度: {}", criterion)))?;
            values.push(value);
        }
        let entries: [T; 4] = values
            .try_into()
            .map_err(|_| D::Error::custom("评分维度数量不正确"))?;
        Ok(Self { entries })
    }
}

/// 单个维度的分数和理由
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriterionScore {
    pub score: u8,
    pub justification: String,
}

impl CriterionMap<CriterionScore> {
    /// 四个维度的总分
    pub fn total_score(&self) -> u32 {
        self.values().map(|s| s.score as u32).sum()
    }
}
