pub struct DefaultConfig;

impl DefaultConfig {
    /// 默认安装目录名
    pub const INSTALL_DIR: &'static str = "node_modules";

    /// scope 分组目录前缀
    pub const SCOPE_PREFIX: &'static str = "@";

    /// 包清单文件名
    pub const MANIFEST_FILE: &'static str = "package.json";

    /// 测量根项目自身大小时默认忽略的规则
    pub fn default_ignore_patterns() -> Vec<String> {
        vec![
            ".git".to_string(),
            Self::INSTALL_DIR.to_string(),
        ]
    }
}
