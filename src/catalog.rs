//! Static catalog of routable contexts and their capabilities.
//!
//! The catalog is flat data: every context owns a fixed list of capabilities
//! and every capability carries the trigger keywords used for routing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a conversational context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextId {
    /// Neutral context used before a request has been routed
    Dashboard,
    Discovery,
    Analysis,
    Execution,
}

impl ContextId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Discovery => "discovery",
            Self::Analysis => "analysis",
            Self::Execution => "execution",
        }
    }

    /// Returns true for contexts that own a catalog entry
    #[must_use]
    pub fn is_routable(self) -> bool {
        self != Self::Dashboard
    }

    /// Display name from the catalog, if this context has an entry
    #[must_use]
    pub fn display_name(self) -> Option<&'static str> {
        context_config(self).map(|config| config.name)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "dashboard" => Ok(Self::Dashboard),
            "discovery" => Ok(Self::Discovery),
            "analysis" => Ok(Self::Analysis),
            "execution" => Ok(Self::Execution),
            other => Err(format!("unknown context '{other}'")),
        }
    }
}

/// A named unit of domain expertise inside a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

/// A routable context and the capabilities it owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    pub id: ContextId,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [Capability],
}

/// Context chosen when no keyword matches
pub const FALLBACK_CONTEXT: ContextId = ContextId::Discovery;

/// Routable contexts in catalog order. Classification ties resolve to the earlier entry.
pub static CATALOG: &[ContextConfig] = &[
    ContextConfig {
        id: ContextId::Discovery,
        name: "发现与洞察系统",
        description: "全网扫描潜在标的，深度剖析行业赛道，捕捉投资先机。",
        capabilities: &[
            Capability {
                id: "industry_hunter",
                name: "产业猎手",
                description: "全网扫描潜在标的，分析产业链上下游。",
                keywords: &[
                    "潜在标的",
                    "产业链图谱",
                    "黑马公司",
                    "上下游关系",
                    "寻找",
                    "扫描",
                    "发现",
                    "搜寻",
                ],
            },
            Capability {
                id: "industry_research",
                name: "行业研究",
                description: "深度剖析细分赛道，输出市场规模与竞争格局。",
                keywords: &[
                    "市场规模",
                    "竞争格局",
                    "细分赛道",
                    "行业壁垒",
                    "TAM/SAM",
                    "研究",
                    "分析",
                    "趋势",
                ],
            },
        ],
    },
    ContextConfig {
        id: ContextId::Analysis,
        name: "分析与估值系统",
        description: "企业尽调、财务审计与估值建模的中台核心引擎。",
        capabilities: &[
            Capability {
                id: "due_diligence",
                name: "智能尽调",
                description: "企业背景深挖、股权穿透及经营风险扫描。",
                keywords: &[
                    "股权结构",
                    "实控人",
                    "历史沿革",
                    "经营风险",
                    "法律诉讼",
                    "尽调",
                    "背景调查",
                    "穿透",
                ],
            },
            Capability {
                id: "financial_audit",
                name: "财务审计",
                description: "财务健康度雷达诊断及异常趋势预警。",
                keywords: &[
                    "财务报表",
                    "盈利能力",
                    "偿债能力",
                    "现金流",
                    "财务造假",
                    "审计",
                    "诊断",
                    "健康度",
                ],
            },
            Capability {
                id: "valuation_comps",
                name: "对标估值",
                description: "自动筛选可比公司，生成估值倍数矩阵。",
                keywords: &[
                    "可比公司",
                    "估值矩阵",
                    "PE倍数",
                    "EV/EBITDA",
                    "市值",
                    "对标",
                    "估值",
                    "计算",
                ],
            },
            Capability {
                id: "valuation_model",
                name: "估值建模",
                description: "辅助搭建DCF模型及财务预测推演。",
                keywords: &[
                    "DCF模型",
                    "WACC",
                    "自由现金流",
                    "财务预测",
                    "敏感性分析",
                    "建模",
                    "折现",
                    "推演",
                ],
            },
        ],
    },
    ContextConfig {
        id: ContextId::Execution,
        name: "执行与合规系统",
        description: "风险监控、材料预审与文书自动化的交付闭环。",
        capabilities: &[
            Capability {
                id: "risk_control",
                name: "合规风控",
                description: "实时监控法律诉讼及监管处罚动态。",
                keywords: &[
                    "监管处罚",
                    "行政处罚",
                    "合规风险",
                    "舆情监控",
                    "黑名单",
                    "监控",
                    "预警",
                    "扫描",
                ],
            },
            Capability {
                id: "compliance_check",
                name: "合规预审",
                description: "IPO上市规则材料预审与反馈模拟。",
                keywords: &[
                    "上市规则",
                    "IPO审核",
                    "反馈意见",
                    "合规性",
                    "问询函",
                    "预审",
                    "检查",
                    "复核",
                ],
            },
            Capability {
                id: "doc_generation",
                name: "文书生成",
                description: "自动起草IC Memo、BP及尽调报告。",
                keywords: &[
                    "IC Memo",
                    "投资建议书",
                    "尽调报告",
                    "商业计划书",
                    "BP",
                    "生成",
                    "撰写",
                    "起草",
                ],
            },
            Capability {
                id: "project_mgmt",
                name: "项目管理",
                description: "全生命周期任务协同与进度追踪。",
                keywords: &["项目进度", "时间表", "任务清单", "工作流", "管理", "追踪", "协同"],
            },
        ],
    },
];

/// Looks up a context's catalog entry by id
#[must_use]
pub fn context_config(id: ContextId) -> Option<&'static ContextConfig> {
    CATALOG.iter().find(|config| config.id == id)
}
