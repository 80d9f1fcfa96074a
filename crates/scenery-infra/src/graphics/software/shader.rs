// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Source-level checks and reflection of GLSL ES 1.0 programs.
//!
//! The software backend does not execute shader code. It validates the
//! structure a real compiler would reject first (balanced delimiters, an
//! entry point, the stage output, calls to undefined functions) and reflects
//! the `uniform`, `attribute` and `varying` declarations the rasterizer
//! reads its inputs from.

use scenery_core::renderer::{ShaderError, ShaderStage};
use std::collections::{HashMap, HashSet};

const BUILTIN_FUNCTIONS: &[&str] = &[
    "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "pow", "exp", "log",
    "exp2", "log2", "sqrt", "inversesqrt", "abs", "sign", "floor", "ceil", "fract", "mod", "min",
    "max", "clamp", "mix", "step", "smoothstep", "length", "distance", "dot", "cross",
    "normalize", "faceforward", "reflect", "refract", "matrixCompMult", "lessThan",
    "lessThanEqual", "greaterThan", "greaterThanEqual", "equal", "notEqual", "any", "all", "not",
    "texture2D", "texture2DProj", "texture2DLod", "textureCube",
];

const TYPES: &[&str] = &[
    "void", "bool", "int", "float", "vec2", "vec3", "vec4", "bvec2", "bvec3", "bvec4", "ivec2",
    "ivec3", "ivec4", "mat2", "mat3", "mat4", "sampler2D", "samplerCube",
];

const KEYWORDS: &[&str] = &["if", "for", "while", "return", "else"];

/// A declared global of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub name: String,
    pub ty: String,
}

/// What one compiled stage declares.
#[derive(Debug, Clone, Default)]
pub(crate) struct StageReflection {
    pub uniforms: Vec<Declaration>,
    pub attributes: Vec<Declaration>,
    pub varyings: Vec<Declaration>,
}

/// The interface of a linked program.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgramReflection {
    /// Uniform name to slot, in declaration order, vertex stage first.
    pub uniforms: HashMap<String, u32>,
    /// Attribute name to slot.
    pub attributes: HashMap<String, u32>,
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => rest = "",
        }
    }
    out.push_str(rest);
    out.lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_delimiters(code: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    for (line_no, line) in code.lines().enumerate() {
        for c in line.chars() {
            match c {
                '{' | '(' | '[' => stack.push(c),
                '}' | ')' | ']' => {
                    let open = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    if stack.pop() != Some(open) {
                        return Err(format!("ERROR: {}: syntax error, unexpected '{c}'", line_no + 1));
                    }
                }
                _ => {}
            }
        }
    }
    match stack.last() {
        Some(open) => Err(format!("ERROR: syntax error, unclosed '{open}' at end of input")),
        None => Ok(()),
    }
}

fn identifiers_followed_by_paren(code: &str) -> Vec<(String, Option<String>)> {
    // Each call site with the identifier right before it, if any.
    let mut calls = Vec::new();
    let bytes = code.as_bytes();
    let mut previous_word: Option<String> = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &code[start..i];
            let mut j = i;
            while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                j += 1;
            }
            if bytes.get(j) == Some(&b'(') {
                calls.push((word.to_string(), previous_word.clone()));
            }
            previous_word = Some(word.to_string());
            continue;
        }
        if c.is_ascii_digit() {
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
            previous_word = None;
            continue;
        }
        if !c.is_whitespace() {
            previous_word = None;
        }
        i += 1;
    }
    calls
}

fn check_calls(code: &str) -> Result<(), String> {
    let calls = identifiers_followed_by_paren(code);
    let defined: HashSet<&str> = calls
        .iter()
        .filter(|(_, before)| before.as_deref().is_some_and(|t| TYPES.contains(&t)))
        .map(|(name, _)| name.as_str())
        .collect();
    for (name, _) in &calls {
        let name = name.as_str();
        if TYPES.contains(&name)
            || KEYWORDS.contains(&name)
            || BUILTIN_FUNCTIONS.contains(&name)
            || defined.contains(name)
        {
            continue;
        }
        return Err(format!("ERROR: '{name}' : no matching overloaded function found"));
    }
    Ok(())
}

fn reflect(code: &str) -> StageReflection {
    let mut reflection = StageReflection::default();
    for statement in code.split([';', '{', '}']) {
        let mut words = statement.split_whitespace();
        let Some(qualifier) = words.next() else {
            continue;
        };
        let list = match qualifier {
            "uniform" => &mut reflection.uniforms,
            "attribute" => &mut reflection.attributes,
            "varying" => &mut reflection.varyings,
            _ => continue,
        };
        let mut ty = words.next();
        if matches!(ty, Some("highp" | "mediump" | "lowp")) {
            ty = words.next();
        }
        let (Some(ty), Some(name)) = (ty, words.next()) else {
            continue;
        };
        let name = name.split('[').next().unwrap_or(name);
        list.push(Declaration {
            name: name.to_string(),
            ty: ty.to_string(),
        });
    }
    reflection
}

/// Validates one stage and reflects its declarations.
pub(crate) fn compile_stage(
    stage: ShaderStage,
    label: &str,
    source: &str,
) -> Result<StageReflection, ShaderError> {
    let fail = |log: String| ShaderError::CompilationFailure {
        stage,
        label: label.to_string(),
        source: source.to_string(),
        log,
    };
    let code = strip_comments(source);
    check_delimiters(&code).map_err(fail)?;
    if !code.contains("void main(") {
        return Err(fail("ERROR: missing entry point 'void main()'".to_string()));
    }
    let output = match stage {
        ShaderStage::Vertex => "gl_Position",
        ShaderStage::Fragment => "gl_FragColor",
    };
    if !code.contains(output) {
        return Err(fail(format!("ERROR: {stage} stage never writes '{output}'")));
    }
    check_calls(&code).map_err(fail)?;

    let reflection = reflect(&code);
    if stage == ShaderStage::Fragment && !reflection.attributes.is_empty() {
        return Err(fail(
            "ERROR: 'attribute' : supported in vertex shaders only".to_string(),
        ));
    }
    Ok(reflection)
}

/// Links two compiled stages.
///
/// Every varying read by the fragment stage must be written by the vertex
/// stage with the same type, and uniforms shared by both stages must agree
/// on their type.
pub(crate) fn link(
    label: &str,
    vertex_source: &str,
    fragment_source: &str,
    vertex: &StageReflection,
    fragment: &StageReflection,
) -> Result<ProgramReflection, ShaderError> {
    let fail = |log: String| ShaderError::LinkFailure {
        label: label.to_string(),
        vertex_source: vertex_source.to_string(),
        fragment_source: fragment_source.to_string(),
        log,
    };
    for varying in &fragment.varyings {
        match vertex.varyings.iter().find(|v| v.name == varying.name) {
            Some(v) if v.ty == varying.ty => {}
            Some(v) => {
                return Err(fail(format!(
                    "Varying '{}' declared as {} in the vertex stage and {} in the fragment stage",
                    varying.name, v.ty, varying.ty
                )))
            }
            None => {
                return Err(fail(format!(
                    "Varying '{}' is not written by the vertex stage",
                    varying.name
                )))
            }
        }
    }

    let mut types: HashMap<&str, &str> = HashMap::new();
    let mut program = ProgramReflection::default();
    for uniform in vertex.uniforms.iter().chain(&fragment.uniforms) {
        match types.get(uniform.name.as_str()) {
            Some(ty) if *ty != uniform.ty => {
                return Err(fail(format!(
                    "Uniform '{}' declared with conflicting types {} and {}",
                    uniform.name, ty, uniform.ty
                )))
            }
            Some(_) => {}
            None => {
                types.insert(&uniform.name, &uniform.ty);
                let slot = program.uniforms.len() as u32;
                program.uniforms.insert(uniform.name.clone(), slot);
            }
        }
    }
    for (slot, attribute) in vertex.attributes.iter().enumerate() {
        program.attributes.insert(attribute.name.clone(), slot as u32);
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "precision highp float;
attribute vec3 aVertex;
uniform mat4 uMMatrix;
varying vec4 vWorldVertex;
void main() {
    vWorldVertex = uMMatrix * vec4(aVertex, 1.0);
    gl_Position = vWorldVertex;
}
";

    const FRAGMENT: &str = "precision highp float;
varying vec4 vWorldVertex;
uniform mat4 uMMatrix; // shared with the vertex stage
uniform vec3 uMaterialBaseColor;
void main() {
    gl_FragColor = vec4(normalize(uMaterialBaseColor), 1.0);
}
";

    #[test]
    fn test_declarations_are_reflected() {
        let vertex = compile_stage(ShaderStage::Vertex, "test", VERTEX).unwrap();
        assert_eq!(vertex.attributes[0].name, "aVertex");
        assert_eq!(vertex.uniforms[0].ty, "mat4");
        assert_eq!(vertex.varyings[0].name, "vWorldVertex");

        let fragment = compile_stage(ShaderStage::Fragment, "test", FRAGMENT).unwrap();
        let program = link("test", VERTEX, FRAGMENT, &vertex, &fragment).unwrap();
        assert_eq!(program.uniforms.len(), 2);
        assert_eq!(program.uniforms["uMMatrix"], 0);
        assert_eq!(program.attributes["aVertex"], 0);
    }

    #[test]
    fn test_unbalanced_braces_fail_to_compile() {
        let broken = VERTEX.replace("gl_Position = vWorldVertex;\n}", "gl_Position = vWorldVertex;");
        let err = compile_stage(ShaderStage::Vertex, "sig", &broken).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::CompilationFailure {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert_eq!(err.label(), "sig");
    }

    #[test]
    fn test_undefined_functions_fail_to_compile() {
        let broken = FRAGMENT.replace("normalize(", "wobble(");
        let err = compile_stage(ShaderStage::Fragment, "sig", &broken).unwrap_err();
        assert!(err.to_string().contains("wobble"));

        let defined = format!("vec3 wobble(vec3 c) {{ return c; }}\n{broken}");
        assert!(compile_stage(ShaderStage::Fragment, "sig", &defined).is_ok());
    }

    #[test]
    fn test_missing_outputs_fail_to_compile() {
        let silent = FRAGMENT.replace("gl_FragColor = ", "vec4 unused = ");
        assert!(compile_stage(ShaderStage::Fragment, "sig", &silent).is_err());
        assert!(compile_stage(ShaderStage::Vertex, "sig", "void main() {}").is_err());
    }

    #[test]
    fn test_unmatched_varyings_fail_to_link() {
        let vertex = compile_stage(ShaderStage::Vertex, "sig", VERTEX).unwrap();
        let reading = FRAGMENT.replace(
            "varying vec4 vWorldVertex;",
            "varying vec4 vWorldVertex;\nvarying vec3 vViewNormal;",
        );
        let fragment = compile_stage(ShaderStage::Fragment, "sig", &reading).unwrap();
        let err = link("sig", VERTEX, &reading, &vertex, &fragment).unwrap_err();
        assert!(matches!(err, ShaderError::LinkFailure { .. }));
        assert!(err.to_string().contains("vViewNormal"));
    }
}
