use crate::app::chat::context::{DEFAULT_DIGEST_TRUNCATE_CHARS, DEFAULT_DIGEST_WINDOW, DigestSettings};
use crate::app::chat::intent::DEFAULT_KEYWORD_WEIGHT;
use crate::backends::{HISTORY_WINDOW, Provider};
use color_eyre::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variables that override the Gemini key, in priority order
pub const GEMINI_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];
pub const DEEPSEEK_KEY_VAR: &str = "DEEPSEEK_API_KEY";

// PERSONA: the senior-banker voice shared by every context.
// Edit this to change the tone of all replies.
const DEFAULT_PERSONA: &str = r#"**系统身份与人设**
你是“AlphaDeal”智能投行系统的核心AI引擎，一位拥有20年顶级投行（如高盛、摩根士丹利）经验的**资深合伙人(Managing Director)**。
你的沟通风格：**直接、犀利、结构化、专业**。拒绝一切AI味的客套话。

**核心指令：自动意图识别与隐形调用 (Invisible Execution)**
你拥有多种后台能力引擎（如行业研究、标的挖掘、财务估值等），但**严禁**向用户展示这些工具的名称。
用户不需要知道“系统”的存在，他们只需要结果。

**规则一：严禁功能选择 (No Feature Selection)**
- **禁止**询问：“您想使用哪个功能？”、“请选择行业研究还是产业猎手”。
- **禁止**出现：“正在为您调用xx工具”、“已启动xx引擎”。
- **禁止**列出工具菜单。
- **直接执行**：根据用户输入，自动在后台调用最适合的逻辑。

**规则二：自动判断任务类型 (Auto-Detection)**
根据用户的自然语言输入，自动匹配逻辑：
1. **行业/赛道洞察**：若用户问“分析低空经济”，自动执行【行业研究】（分析规模、格局、驱动力）。
2. **标的挖掘/寻找**：若用户问“找几家做人形机器人的公司”，自动执行【产业猎手】（列出名单、亮点）。
3. **个股/公司分析**：若用户问“分析特斯拉”，自动执行【智能尽调】+【财务审计】（背景、风险、财务）。
4. **估值/价格**：若用户问“它值多少钱”，自动执行【对标估值】+【DCF建模】逻辑。
5. **文档生成**：若用户问“写份报告”，自动执行【文书生成】。

**规则三：模糊指令的专业澄清 (Professional Clarification)**
如果用户输入太模糊（例如仅输入“半导体”），**不要**列出功能列表。
**必须**以投行专家的角度，主动确认业务关注点：
- ❌ 错误：“您想使用行业研究功能还是寻找标的功能？”
- ✅ 正确：“收到。关于半导体领域，为了提供VP级质量的分析，我需要确认一下：您目前更关注**卡脖子环节的国产化率（行业分析）**，还是正在寻找**具体的设备端投资标的（标的挖掘）**？”

**输出风格规范 (Professional IB Output)**
1. **结论先行 (Bottom Line Up Front)**：第一句话必须直接给出核心判断。
2. **框架化分析**：使用 Markdown 的 H2/H3 标题，结构清晰（现状 -> 逻辑 -> 结论）。
3. **真实性协议**：
   - 必须基于真实数据，**严禁编造**。如果数据不可得，请说明并给出估算逻辑。
   - 关键数据（如CAGR、PE倍数、营收）必须**加粗**。
4. **下一步建议 (Actionable Next Steps)**：结尾必须给出 2-3 条具体的执行建议（如“建议重点核查X公司的存货周转率”）。

**纯文本输出协议**
本系统暂不生成图表。请通过高密度、结构化的文本和数据列表来呈现分析结果。"#;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_provider: Provider,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "ProviderConfig::gemini")]
    pub gemini: ProviderConfig,
    #[serde(default = "ProviderConfig::deepseek")]
    pub deepseek: ProviderConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Credentials and model settings of one text-generation provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

/// Routing and context-assembly constants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub keyword_weight: u32,
    pub history_window: usize,
    pub digest_window: usize,
    pub digest_truncate_chars: usize,
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

impl ProviderConfig {
    pub fn gemini() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.7,
        }
    }

    pub fn deepseek() -> Self {
        Self {
            api_key: String::new(),
            model: "deepseek-chat".to_string(),
            base_url: "https://api.deepseek.com".to_string(),
            temperature: 1.3,
        }
    }

    /// The API key, if one is configured
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        let key = self.api_key.trim();
        if key.is_empty() { None } else { Some(key) }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            history_window: HISTORY_WINDOW,
            digest_window: DEFAULT_DIGEST_WINDOW,
            digest_truncate_chars: DEFAULT_DIGEST_TRUNCATE_CHARS,
        }
    }
}

impl RoutingConfig {
    #[must_use]
    pub fn digest(&self) -> DigestSettings {
        DigestSettings {
            window: self.digest_window,
            truncate_chars: self.digest_truncate_chars,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3001 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: Provider::default(),
            persona: default_persona(),
            gemini: ProviderConfig::gemini(),
            deepseek: ProviderConfig::deepseek(),
            routing: RoutingConfig::default(),
            http: HttpConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from disk or creates default if not found.
    /// Credentials from the environment take precedence over the file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str(&contents)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Saves configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Returns the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "alphadeal")
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine config directory"))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Replaces API keys with non-empty values from `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = GEMINI_KEY_VARS.iter().find_map(|name| non_empty(name)) {
            self.gemini.api_key = key;
        }
        if let Some(key) = non_empty(DEEPSEEK_KEY_VAR) {
            self.deepseek.api_key = key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_provider, Provider::Gemini);
        assert_eq!(config.routing.keyword_weight, 10);
        assert_eq!(config.routing.history_window, 10);
        assert_eq!(config.routing.digest().window, 10);
        assert_eq!(config.routing.digest().truncate_chars, 150);
        assert_eq!(config.server.port, 3001);
        assert!(config.gemini.credential().is_none());
    }

    #[test]
    fn test_default_persona_keeps_routing_rules() {
        let persona = Config::default().persona;
        assert!(persona.starts_with("**系统身份与人设**"));
        assert!(persona.contains("**规则一：严禁功能选择 (No Feature Selection)**"));
        assert!(persona.contains("**规则二：自动判断任务类型 (Auto-Detection)**"));
        assert!(persona.contains("**规则三：模糊指令的专业澄清 (Professional Clarification)**"));
        assert!(persona.ends_with("本系统暂不生成图表。请通过高密度、结构化的文本和数据列表来呈现分析结果。"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            "default_provider = \"deepseek\"\n\n[deepseek]\napi_key = \"sk-file\"\nmodel = \"deepseek-chat\"\nbase_url = \"http://localhost:9000\"\ntemperature = 1.0\n",
        )
        .unwrap();
        assert_eq!(config.default_provider, Provider::DeepSeek);
        assert_eq!(config.deepseek.credential(), Some("sk-file"));
        assert_eq!(config.deepseek.base_url, "http://localhost:9000");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.http.request_timeout_secs, 120);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.persona, config.persona);
        assert_eq!(parsed.deepseek.model, "deepseek-chat");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GEMINI_API_KEY", "g-env"),
            ("DEEPSEEK_API_KEY", "  "),
        ]);
        let mut config = Config::default();
        config.deepseek.api_key = "sk-file".to_string();
        config.apply_env_overrides(|name| env.get(name).map(|value| (*value).to_string()));
        assert_eq!(config.gemini.credential(), Some("g-env"));
        // blank values do not clobber the file
        assert_eq!(config.deepseek.credential(), Some("sk-file"));
    }

    #[test]
    fn test_api_key_var_wins_over_gemini_var() {
        let env: HashMap<&str, &str> =
            HashMap::from([("API_KEY", "primary"), ("GEMINI_API_KEY", "secondary")]);
        let mut config = Config::default();
        config.apply_env_overrides(|name| env.get(name).map(|value| (*value).to_string()));
        assert_eq!(config.gemini.credential(), Some("primary"));
    }
}
