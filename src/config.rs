use config::{Config, Environment, File};
use serde::Deserialize;

use crate::detector::DEFAULT_MINIMUM_BYTES;

/// 应用配置总结构
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub detection: DetectionSettings,
}

/// 服务相关配置（监听地址、端口）
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// 类型检测配置
#[derive(Debug, Deserialize, Clone)]
pub struct DetectionSettings {
    /// 检测器需要的最小前缀长度（单位：字节），同时是中继缓冲上限，默认 4100
    pub minimum_bytes: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            minimum_bytes: DEFAULT_MINIMUM_BYTES,
        }
    }
}

impl Settings {
    /// 加载配置：支持默认值、可选配置文件、环境变量覆盖
    pub fn new() -> anyhow::Result<Self> {
        let builder = Config::builder()
            // 默认值（代码内硬编码）
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("detection.minimum_bytes", DEFAULT_MINIMUM_BYTES as u64)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("VTX").separator("__"));

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;
        if settings.detection.minimum_bytes == 0 {
            anyhow::bail!("detection.minimum_bytes must be greater than zero");
        }
        Ok(settings)
    }
}
