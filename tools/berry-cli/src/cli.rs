//! 命令行参数.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mr_berry::{Label, Params};

/// 3D MR 全身分割标签后处理.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// 参数文件 (TOML). 缺省时依次尝试 `$MR_BERRY_CONFIG` 与用户配置目录.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出调试日志.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 将本次运行的统计信息以 TOML 格式写入该文件.
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// 子命令.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// 为标签添加皮肤层.
    Skin {
        /// 输入标签.
        #[arg(short, long)]
        input: PathBuf,

        /// 输出标签.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// 检测逐切片空洞, 将空洞保存为值为 1 的掩码.
    Holes {
        /// 输入标签.
        #[arg(short, long)]
        input: PathBuf,

        /// 输出空洞掩码.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 以脂肪分数填充空洞.
    Fill {
        /// 输入标签.
        #[arg(short, long)]
        input: PathBuf,

        /// 脂肪分数图.
        #[arg(long)]
        ff: PathBuf,

        /// 输出标签.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// 由脂/水图像计算脂肪分数图.
    Ff {
        /// 脂肪图像.
        #[arg(long)]
        fat: PathBuf,

        /// 水图像.
        #[arg(long)]
        water: PathBuf,

        /// 输出脂肪分数图.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 将组织类型分割中的 VAT 合并进主分割.
    Merge {
        /// 主分割标签.
        #[arg(long)]
        base: PathBuf,

        /// 组织类型分割标签.
        #[arg(long)]
        types: PathBuf,

        /// 输出标签.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// 按内置解剖学分组折叠标签.
    Collapse {
        /// 输入标签.
        #[arg(short, long)]
        input: PathBuf,

        /// 输出标签.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 依次执行 merge, fill, collapse, skin.
    Run {
        /// 主分割标签.
        #[arg(long)]
        base: PathBuf,

        /// 组织类型分割标签.
        #[arg(long)]
        types: PathBuf,

        /// 脂肪分数图.
        #[arg(long)]
        ff: PathBuf,

        /// 输出标签.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// 覆盖参数文件中的值.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// 皮肤层厚度 (体素).
    #[arg(long)]
    pub thickness: Option<u32>,

    /// 皮肤层标签.
    #[arg(long)]
    pub skin_label: Option<Label>,

    /// 空洞填充标签.
    #[arg(long)]
    pub fat_label: Option<Label>,

    /// 脂肪分数门限.
    #[arg(long)]
    pub ff_threshold: Option<f32>,

    /// VAT 临时标签.
    #[arg(long)]
    pub vat_label: Option<Label>,
}

impl Overrides {
    /// 将命令行给出的值写入 `params`.
    pub fn apply_to(&self, params: &mut Params) {
        if let Some(v) = self.thickness {
            params.thickness = v;
        }
        if let Some(v) = self.skin_label {
            params.skin_label = v;
        }
        if let Some(v) = self.fat_label {
            params.fat_label = v;
        }
        if let Some(v) = self.ff_threshold {
            params.ff_threshold = v;
        }
        if let Some(v) = self.vat_label {
            params.vat_label = v;
        }
    }
}

impl Command {
    /// 子命令附带的参数覆盖项.
    pub fn overrides(&self) -> Option<&Overrides> {
        match self {
            Command::Skin { overrides, .. }
            | Command::Fill { overrides, .. }
            | Command::Merge { overrides, .. }
            | Command::Run { overrides, .. } => Some(overrides),
            Command::Holes { .. } | Command::Ff { .. } | Command::Collapse { .. } => None,
        }
    }
}
