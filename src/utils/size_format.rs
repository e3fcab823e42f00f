const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// 数值的醒目程度，由渲染层映射为具体颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Plain,
    Green,
    Yellow,
    Red,
    Magenta,
}

/// 格式化字节数，例如 `512 B`、`1.5 KB`、`12.34 MB`
pub fn format_size(bytes: u64) -> String {
    let (value, unit) = match bytes {
        b if b < KB => return format!("{} B", b),
        b if b < MB => (b as f64 / KB as f64, "KB"),
        b if b < GB => (b as f64 / MB as f64, "MB"),
        b if b < TB => (b as f64 / GB as f64, "GB"),
        b => (b as f64 / TB as f64, "TB"),
    };
    format!("{} {}", round2(value), unit)
}

/// 大小的颜色档位：MB 级按 10/100 MB 分为绿黄红，GB 以上为洋红
pub fn size_tier(bytes: u64) -> Tier {
    match bytes {
        b if b < MB => Tier::Plain,
        b if b < 10 * MB => Tier::Green,
        b if b < 100 * MB => Tier::Yellow,
        b if b < GB => Tier::Red,
        _ => Tier::Magenta,
    }
}

/// 带千位分隔符的整数
pub fn format_count(count: usize) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// 嵌套数量的颜色档位
pub fn nested_tier(count: usize) -> Tier {
    match count {
        0 => Tier::Plain,
        1..=5 => Tier::Green,
        6..=10 => Tier::Yellow,
        _ => Tier::Red,
    }
}

/// 百分比，两位小数
pub fn format_percent(percent: f64) -> String {
    format!("{:.2} %", percent)
}

/// 重复率的颜色档位
pub fn percent_tier(percent: f64) -> Tier {
    if percent > 20.0 {
        Tier::Red
    } else if percent > 10.0 {
        Tier::Yellow
    } else if percent > 0.0 {
        Tier::Green
    } else {
        Tier::Plain
    }
}

/// 四舍五入到两位小数并去掉多余的 0
fn round2(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
