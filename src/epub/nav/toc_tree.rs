//! 目录树（Table of Contents Tree）模块
//!
//! 提供导航表的树形文本渲染与统计。

use crate::epub::nav::table::{NavigationPoint, NavigationTable};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 目录树显示样式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocTreeStyle {
    /// 使用树状符号（├── └──）
    TreeSymbols,
    /// 使用缩进和符号（• ）
    Indented,
}

/// 目录树节点
#[derive(Debug, Clone)]
pub struct TocTreeNode {
    /// 先序编号（从1开始）
    pub order: usize,
    /// 标题
    pub title: String,
    /// 目标路径
    pub target: Option<String>,
    /// 节点深度
    pub depth: usize,
    /// 子节点
    pub children: Vec<TocTreeNode>,
}

impl TocTreeNode {
    /// 由导航点递归构建，`next_order`在先序遍历中递增
    fn from_point(point: &NavigationPoint, depth: usize, next_order: &mut usize) -> Self {
        *next_order += 1;
        let mut node = Self {
            order: *next_order,
            title: point.label.clone(),
            target: point.target.clone(),
            depth,
            children: Vec::new(),
        };
        for child in &point.children {
            node.children.push(Self::from_point(child, depth + 1, next_order));
        }
        node
    }

    /// 获取子树最大深度
    pub fn max_depth(&self) -> usize {
        1 + self.children.iter().map(TocTreeNode::max_depth).max().unwrap_or(0)
    }

    /// 获取子树节点总数
    pub fn total_nodes(&self) -> usize {
        1 + self.children.iter().map(TocTreeNode::total_nodes).sum::<usize>()
    }

    /// 获取子树叶子节点数
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(TocTreeNode::leaf_count).sum()
        }
    }

    fn label(&self, show_paths: bool) -> String {
        match (&self.target, show_paths) {
            (Some(target), true) => format!("[{}] {} → {}", self.order, self.title, target),
            _ => format!("[{}] {}", self.order, self.title),
        }
    }
}

/// 目录树结构
#[derive(Debug, Clone)]
pub struct TocTree {
    /// 标题行
    pub title: Option<String>,
    /// 根节点列表
    pub roots: Vec<TocTreeNode>,
    /// 显示样式
    pub style: TocTreeStyle,
    /// 是否显示目标路径
    pub show_paths: bool,
    /// 最大显示深度（None表示显示所有）
    pub max_depth: Option<usize>,
}

impl TocTree {
    /// 由导航表创建目录树，标题取表头，没有表头时取类型名
    pub fn from_table(table: &NavigationTable) -> Self {
        let mut next_order = 0;
        Self {
            title: Some(table.heading.clone().unwrap_or_else(|| table.title.clone())),
            roots: table
                .points
                .iter()
                .map(|point| TocTreeNode::from_point(point, 0, &mut next_order))
                .collect(),
            style: TocTreeStyle::TreeSymbols,
            show_paths: true,
            max_depth: None,
        }
    }

    /// 设置显示样式
    pub fn with_style(mut self, style: TocTreeStyle) -> Self {
        self.style = style;
        self
    }

    /// 设置是否显示目标路径
    pub fn with_show_paths(mut self, show_paths: bool) -> Self {
        self.show_paths = show_paths;
        self
    }

    /// 设置最大显示深度
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 获取目录树的统计信息
    pub fn statistics(&self) -> TocStatistics {
        TocStatistics {
            total_nodes: self.roots.iter().map(TocTreeNode::total_nodes).sum(),
            max_depth: self.roots.iter().map(TocTreeNode::max_depth).max().unwrap_or(0),
            leaf_count: self.roots.iter().map(TocTreeNode::leaf_count).sum(),
            root_count: self.roots.len(),
        }
    }

    /// 按索引路径获取节点，如`[0, 1]`为第一个根节点的第二个子节点
    pub fn node_by_path(&self, path: &[usize]) -> Option<&TocTreeNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for &index in rest {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    fn within_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max_depth| depth < max_depth)
    }

    /// 渲染树状符号风格
    fn render_tree_style(&self, node: &TocTreeNode, is_last: bool, prefix: &str, result: &mut String) {
        if !self.within_depth(node.depth) {
            return;
        }

        let branch = if is_last { "└── " } else { "├── " };
        result.push_str(&format!("{}{}{}\n", prefix, branch, node.label(self.show_paths)));

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        for (index, child) in node.children.iter().enumerate() {
            let is_child_last = index + 1 == node.children.len();
            self.render_tree_style(child, is_child_last, &child_prefix, result);
        }
    }

    /// 渲染缩进风格
    fn render_indent_style(&self, node: &TocTreeNode, result: &mut String) {
        if !self.within_depth(node.depth) {
            return;
        }

        let indent = "  ".repeat(node.depth);
        result.push_str(&format!("{}• {}\n", indent, node.label(self.show_paths)));

        for child in &node.children {
            self.render_indent_style(child, result);
        }
    }
}

impl Display for TocTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut result = String::new();

        if let Some(ref title) = self.title {
            let depth_info = match self.max_depth {
                Some(max_depth) => format!(" (深度限制: {})", max_depth),
                None => String::new(),
            };
            result.push_str(&format!("📖 {}{}\n", title, depth_info));
            result.push_str("═══════════════════════════════════════\n");
        }

        for (index, root) in self.roots.iter().enumerate() {
            match self.style {
                TocTreeStyle::TreeSymbols => {
                    self.render_tree_style(root, index + 1 == self.roots.len(), "", &mut result)
                }
                TocTreeStyle::Indented => self.render_indent_style(root, &mut result),
            }
        }

        write!(f, "{}", result)
    }
}

/// 目录树统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocStatistics {
    /// 总节点数
    pub total_nodes: usize,
    /// 最大深度
    pub max_depth: usize,
    /// 叶子节点数
    pub leaf_count: usize,
    /// 根节点数
    pub root_count: usize,
}

impl Display for TocStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "目录统计: {} 个条目, {} 个根节点, {} 个叶子节点, 最大深度: {}",
            self.total_nodes, self.root_count, self.leaf_count, self.max_depth
        )
    }
}
